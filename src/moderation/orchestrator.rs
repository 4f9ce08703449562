use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ModerationError;
use crate::moderation::keywords::KeywordList;
use crate::moderation::ocr::TextExtractor;
use crate::moderation::pipeline::ImagePipeline;

/// Posted after deleting a message whose image the classifier flagged.
pub const IMAGE_WARNING: &str = "⚠️ Sapos não são bem vindos por aqui! 🐸🚫";

/// Attachment extensions that go through the image checks.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn image_text_warning(mention: &str) -> String {
    format!("⚠️ {}, imagem removida devido a texto ilícito detectado!", mention)
}

fn chat_text_warning(mention: &str) -> String {
    format!("⚠️ {}, sem palavras ilícitas no chat!", mention)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub id: String,
    /// Pre-rendered mention string, e.g. `<@123>`.
    pub mention: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A side effect for the chat platform, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Delete { message_id: String },
    Send { channel_id: String, content: String },
}

/// Fetches attachment bytes from wherever the platform stores them.
pub trait AttachmentSource: Send + Sync {
    fn fetch(&self, attachment: &Attachment) -> Result<Vec<u8>, ModerationError>;
}

/// Decides what to do with each inbound chat message.
///
/// Checks run in message order: every image attachment (classifier, then
/// OCR + keywords on licit images), then the text body. The first check that
/// fires schedules a delete and its warning; nothing after it runs, since
/// the message is gone.
pub struct Moderator {
    pipeline: ImagePipeline,
    keywords: KeywordList,
    ocr: Box<dyn TextExtractor>,
    attachments: Box<dyn AttachmentSource>,
    self_id: Option<String>,
    scratch_dir: Option<PathBuf>,
}

impl Moderator {
    pub fn new(
        pipeline: ImagePipeline,
        keywords: KeywordList,
        ocr: Box<dyn TextExtractor>,
        attachments: Box<dyn AttachmentSource>,
    ) -> Self {
        Moderator { pipeline, keywords, ocr, attachments, self_id: None, scratch_dir: None }
    }

    /// Stores attachment scratch files under `dir` instead of the system
    /// temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Sets the bot's own user id; its messages are never moderated.
    pub fn set_self_id(&mut self, id: impl Into<String>) {
        self.self_id = Some(id.into());
    }

    pub fn moderate(&self, msg: &InboundMessage) -> Vec<Action> {
        if self.self_id.as_deref() == Some(msg.author.id.as_str()) {
            return Vec::new();
        }

        let warning = msg.attachments.iter()
            .filter(|a| a.is_image())
            .find_map(|a| self.check_attachment(msg, a))
            .or_else(|| self.check_text(msg));

        match warning {
            Some(content) => vec![
                Action::Delete { message_id: msg.id.clone() },
                Action::Send { channel_id: msg.channel_id.clone(), content },
            ],
            None => Vec::new(),
        }
    }

    fn check_text(&self, msg: &InboundMessage) -> Option<String> {
        let hit = self.keywords.find_banned(&msg.content)?;
        log::info!("Message {} contains banned keyword `{}`", msg.id, hit);
        Some(chat_text_warning(&msg.author.mention))
    }

    /// Returns the warning to post when this attachment gets the message
    /// removed. Every failure along the way is logged and treated as clean.
    fn check_attachment(&self, msg: &InboundMessage, attachment: &Attachment) -> Option<String> {
        let bytes = match self.attachments.fetch(attachment) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Could not fetch attachment {}: {}", attachment.filename, e);
                return None;
            }
        };

        // Removed when dropped, whichever way this function returns.
        let scratch = match save_scratch(attachment, &bytes, self.scratch_dir.as_deref()) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("Could not store attachment {}: {}", attachment.filename, e);
                return None;
            }
        };
        log::info!("Image {} received ({} bytes)", attachment.filename, bytes.len());

        match self.pipeline.classify(&bytes) {
            Ok(verdict) if !verdict.is_licit => {
                log::info!(
                    "Image {} in message {} classified illicit (score {:.4})",
                    attachment.filename,
                    msg.id,
                    verdict.raw_score
                );
                return Some(IMAGE_WARNING.to_owned());
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not classify {}: {}", attachment.filename, e),
        }

        let text = match self.ocr.extract_text(scratch.path()) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("OCR failed for {}: {}", attachment.filename, e);
                return None;
            }
        };
        match self.keywords.find_banned(&text) {
            Some(hit) => {
                log::info!("Image {} contains banned keyword `{}`", attachment.filename, hit);
                Some(image_text_warning(&msg.author.mention))
            }
            None => {
                log::debug!("Image {} is licit and has no banned text", attachment.filename);
                None
            }
        }
    }
}

fn save_scratch(
    attachment: &Attachment,
    bytes: &[u8],
    dir: Option<&Path>,
) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = Path::new(&attachment.filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    let mut builder = tempfile::Builder::new();
    builder.prefix("optic-attachment-").suffix(&suffix);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::preprocess::NormalizedTensor;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    struct FixedScore(Option<f64>);

    impl Classifier for FixedScore {
        fn predict(&self, _tensor: &NormalizedTensor) -> Result<f64, ModerationError> {
            self.0.ok_or_else(|| ModerationError::ModelUnavailable("no model".into()))
        }

        fn ensure_ready(&self) -> Result<(), ModerationError> {
            self.0.map(|_| ()).ok_or_else(|| ModerationError::ModelUnavailable("no model".into()))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Returns canned text and records which paths it was asked to read.
    struct CannedOcr {
        text: Option<String>,
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl TextExtractor for CannedOcr {
        fn extract_text(&self, image_path: &Path) -> Result<String, ModerationError> {
            assert!(image_path.exists());
            self.seen.lock().unwrap().push(image_path.to_path_buf());
            self.text.clone().ok_or_else(|| ModerationError::OcrFailure("engine missing".into()))
        }
    }

    struct PngSource;

    impl AttachmentSource for PngSource {
        fn fetch(&self, attachment: &Attachment) -> Result<Vec<u8>, ModerationError> {
            if attachment.url.contains("missing") {
                return Err(ModerationError::Io(std::io::ErrorKind::NotFound.into()));
            }
            let mut buf = Vec::new();
            DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([0, 120, 0])))
                .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
                .unwrap();
            Ok(buf)
        }
    }

    fn moderator(score: Option<f64>, ocr_text: Option<&str>) -> (Moderator, Arc<Mutex<Vec<PathBuf>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ocr = CannedOcr { text: ocr_text.map(str::to_owned), seen: seen.clone() };
        let m = Moderator::new(
            ImagePipeline::new(Arc::new(FixedScore(score))),
            KeywordList::builtin(),
            Box::new(ocr),
            Box::new(PngSource),
        );
        (m, seen)
    }

    fn message(content: &str, files: &[&str]) -> InboundMessage {
        InboundMessage {
            id: "m1".into(),
            channel_id: "c1".into(),
            author: Author { id: "u1".into(), mention: "<@u1>".into() },
            content: content.into(),
            attachments: files.iter()
                .map(|f| Attachment { filename: (*f).into(), url: format!("https://cdn/{}", f) })
                .collect(),
        }
    }

    fn delete_m1() -> Action {
        Action::Delete { message_id: "m1".into() }
    }

    fn send_c1(content: &str) -> Action {
        Action::Send { channel_id: "c1".into(), content: content.into() }
    }

    #[test]
    fn illicit_image_with_banned_text_deletes_once() {
        let (m, seen) = moderator(Some(0.1), Some("merda"));
        let actions = m.moderate(&message("que merda", &["frog.png"]));
        assert_eq!(actions, vec![delete_m1(), send_c1(IMAGE_WARNING)]);
        // Illicit images skip OCR.
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn licit_image_with_banned_ocr_text() {
        let (m, _) = moderator(Some(0.9), Some("PORRA"));
        let actions = m.moderate(&message("", &["meme.JPG"]));
        assert_eq!(
            actions,
            vec![delete_m1(), send_c1("⚠️ <@u1>, imagem removida devido a texto ilícito detectado!")]
        );
    }

    #[test]
    fn clean_image_then_banned_chat_text() {
        let (m, _) = moderator(Some(0.9), Some("bom dia"));
        let actions = m.moderate(&message("vai se foder", &["a.jpeg"]));
        assert_eq!(actions, vec![delete_m1(), send_c1("⚠️ <@u1>, sem palavras ilícitas no chat!")]);
    }

    #[test]
    fn clean_message_produces_nothing() {
        let (m, _) = moderator(Some(0.9), Some(""));
        assert!(m.moderate(&message("bom dia", &["a.png"])).is_empty());
    }

    #[test]
    fn non_image_attachments_are_ignored() {
        let (m, seen) = moderator(Some(0.1), Some("merda"));
        assert!(m.moderate(&message("oi", &["notes.txt", "clip.gif"])).is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn own_messages_are_skipped() {
        let (mut m, _) = moderator(Some(0.1), None);
        m.set_self_id("u1");
        assert!(m.moderate(&message("merda", &["a.png"])).is_empty());
    }

    #[test]
    fn unavailable_model_still_runs_ocr() {
        let (m, seen) = moderator(None, Some("caralho"));
        let actions = m.moderate(&message("", &["a.png"]));
        assert_eq!(actions.len(), 2);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn ocr_failure_falls_through_to_text_check() {
        let (m, _) = moderator(Some(0.9), None);
        let actions = m.moderate(&message("bosta", &["a.png"]));
        assert_eq!(actions, vec![delete_m1(), send_c1("⚠️ <@u1>, sem palavras ilícitas no chat!")]);
    }

    #[test]
    fn failed_fetch_skips_attachment() {
        let (m, seen) = moderator(Some(0.1), None);
        let mut msg = message("", &["a.png"]);
        msg.attachments[0].url = "https://cdn/missing.png".into();
        assert!(m.moderate(&msg).is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn scratch_files_are_removed() {
        let scratch = tempfile::tempdir().unwrap();
        let (m, seen) = moderator(Some(0.9), Some("texto limpo"));
        let m = m.with_scratch_dir(scratch.path());
        m.moderate(&message("", &["a.png", "b.jpg"]));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|p| p.starts_with(scratch.path()) && !p.exists()));
        assert_eq!(entries(scratch.path()), 0);
    }

    #[test]
    fn scratch_file_removed_after_illicit_verdict() {
        let scratch = tempfile::tempdir().unwrap();
        let (m, seen) = moderator(Some(0.1), Some("texto"));
        let m = m.with_scratch_dir(scratch.path());
        let actions = m.moderate(&message("", &["sapo.png"]));
        assert_eq!(actions, vec![delete_m1(), send_c1(IMAGE_WARNING)]);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(entries(scratch.path()), 0);
    }

    #[test]
    fn scratch_file_removed_after_ocr_failure() {
        let scratch = tempfile::tempdir().unwrap();
        let (m, seen) = moderator(Some(0.9), None);
        let m = m.with_scratch_dir(scratch.path());
        assert!(m.moderate(&message("", &["a.png"])).is_empty());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with(scratch.path()));
        assert!(!seen[0].exists());
        assert_eq!(entries(scratch.path()), 0);
    }

    #[test]
    fn action_wire_format() {
        let json = serde_json::to_string(&delete_m1()).unwrap();
        assert_eq!(json, r#"{"op":"delete","message_id":"m1"}"#);
        let json = serde_json::to_string(&send_c1("hi")).unwrap();
        assert_eq!(json, r#"{"op":"send","channel_id":"c1","content":"hi"}"#);
    }
}
