pub mod alerts;
pub mod ingest;
pub mod subscription;
