pub mod keywords;
pub mod ocr;
pub mod pipeline;
pub mod orchestrator;
pub mod platform;

pub use keywords::KeywordList;
pub use ocr::{binarize_for_ocr, TesseractOcr, TextExtractor};
pub use orchestrator::{
    Action, Attachment, AttachmentSource, Author, InboundMessage, Moderator, IMAGE_WARNING,
};
pub use pipeline::ImagePipeline;
pub use platform::{execute, ChatPlatform, PlatformError};
