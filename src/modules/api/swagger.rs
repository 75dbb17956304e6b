use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    nest( (path = "/api", api = super::HealthMonitorApi) ),
    tags( (name = "Home Health Monitor API", description = "Sensor ingestion and dashboard queries") )
)]
pub struct HealthMonitorDoc;
