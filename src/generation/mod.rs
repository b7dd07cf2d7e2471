pub mod aspect;
pub mod extract;
pub mod orchestrator;
pub mod outcome;
pub mod request;
pub mod style;

pub use aspect::{AspectRatio, Dimensions, SizeClass, resolve_dimensions};
pub use orchestrator::{Cancelled, ImageOrchestrator};
pub use outcome::{
    GenerationOutcome, GenerationResponse, PLACEHOLDER_PROVIDER, PlaceholderReason, ProviderResult,
};
pub use request::{GenerationPlan, GenerationRequest, PROMPT_REQUIRED, ValidationError};
pub use style::{Style, enhance_prompt};
