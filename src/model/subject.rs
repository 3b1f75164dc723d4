use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Subject {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Mathematics")]
    pub name: String,
    #[schema(example = "MATH101")]
    pub code: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
}
