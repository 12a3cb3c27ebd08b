pub mod file_service_client;

pub use file_service_client::FileServiceClient;
