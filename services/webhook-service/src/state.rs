use std::sync::Arc;

use crate::sheets::RowSink;

#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn RowSink>,
}

impl AppState {
    pub fn new(sink: Arc<dyn RowSink>) -> Self {
        Self { sink }
    }
}
