/// A fully materialized result set. `None` cells are SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

pub trait Client {
    type Error;

    fn fetch_all(
        &self,
        statement: &str,
    ) -> impl Future<Output = Result<Table, Self::Error>> + Send;
}
