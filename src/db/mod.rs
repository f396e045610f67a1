//! Database layer - connection handling, schema resolution and batch appends

pub mod appender;
pub mod pool;
pub mod schema;

use async_trait::async_trait;

use crate::error::Result;
use crate::ingest::NormalizedBatch;

pub use appender::TableAppender;
pub use pool::{ConnectionParams, Driver, Pool};

/// Destination for normalized batches
#[async_trait]
pub trait BatchSink: Send {
    /// Append every row of `batch` to `table`, returning the number of rows written
    async fn append(&mut self, table: &str, batch: &NormalizedBatch) -> Result<u64>;
}

/// Opens a [`BatchSink`], failing if the database cannot be reached
#[async_trait]
pub trait Connector: Send + Sync {
    type Sink: BatchSink;

    async fn connect(&self) -> Result<Self::Sink>;
}

/// Connects to the database described by [`ConnectionParams`]
#[derive(Debug, Clone)]
pub struct PoolConnector {
    params: ConnectionParams,
}

impl PoolConnector {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Connector for PoolConnector {
    type Sink = TableAppender;

    async fn connect(&self) -> Result<TableAppender> {
        let pool = Pool::connect(&self.params).await?;
        Ok(TableAppender::new(pool))
    }
}
