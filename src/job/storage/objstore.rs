use std::path::Path;

pub trait Client {
    type Error;

    /// Keys under `prefix`, in the order the store returns them.
    fn list_keys(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    /// Write the object to `dest`. The parent directory already exists.
    fn download(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
