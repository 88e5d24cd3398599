use poem_openapi::payload::Json;

use crate::schema::common::{api_responses, MessageResponse};

api_responses! {
    pub enum HealthResponses {
        #[oai(status = 200)]
        Ok(Json<MessageResponse>),
    }
}
