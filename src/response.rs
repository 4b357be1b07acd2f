use crate::serde::Serialize;

#[derive(Debug, Serialize)]
pub struct List<T> {
    list: Vec<T>,
    total: i64,
    page: i64,
    limit: i64,
}

impl<T> List<T> {
    pub fn new(list: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        List { list, total, page, limit }
    }
}
