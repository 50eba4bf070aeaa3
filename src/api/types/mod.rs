//! Request, response and error types of the HTTP surface

pub mod error;
pub mod json;
pub mod practice;
pub mod stream;
pub mod training;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use practice::{LevelInfo, StartPracticeRequest, StartPracticeResponse, StopPracticeResponse};
pub use stream::{FrameMessage, FrameResponse, StreamError};
pub use training::{
    required, AddSampleRequest, AdminAddSampleRequest, AdminCompleteRequest,
    CompleteTrainingRequest, CompleteTrainingResponse, LevelModelsResponse, ResultStatus,
    SampleResponse, StartTrainingRequest, StartTrainingResponse,
};
