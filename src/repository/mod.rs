pub mod connection;
pub mod execution_repository;
pub mod pipeline_repository;

pub use connection::establish_connection;
pub use execution_repository::ExecutionRepository;
pub use pipeline_repository::PipelineRepository;

pub type DbPool = sqlx::SqlitePool;
