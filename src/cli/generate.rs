use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::OutputFormat;
use crate::cli::ui::{Painter, TagImageView};
use crate::error::CliConfigError;
use crate::ndef::PayloadKind;
use crate::tag::{ImageRequest, TagImage, TagType, TagUid, suggested_file_name};
use crate::terminal::TerminalClient;

/// Payload options shared by `generate` and `upload`.
#[derive(Debug, Args)]
pub struct PayloadArgs {
    /// Tag family to emulate.
    #[arg(long, default_value = "NTAG215")]
    tag_type: TagType,
    /// Record kind: url, phone, email, text, vcard, wifi, app or mime.
    #[arg(long)]
    kind: PayloadKind,
    /// Fixed 7-byte UID as hexadecimal instead of a random one.
    #[arg(long)]
    uid: Option<TagUid>,
    /// Reads the payload from a file instead of the command line.
    #[arg(long)]
    input_file: Option<PathBuf>,
    /// Payload text.
    input: Option<String>,
}

impl PayloadArgs {
    /// Creates payload options for inline input.
    ///
    /// ```
    /// use ntag::{PayloadArgs, PayloadKind, TagType};
    ///
    /// let args = PayloadArgs::new(TagType::Ntag213, PayloadKind::Url, "https://example.com");
    /// assert_eq!(TagType::Ntag213, args.tag_type());
    /// assert_eq!(PayloadKind::Url, args.kind());
    /// assert_eq!(Some("https://example.com"), args.input());
    /// ```
    #[must_use]
    pub fn new(tag_type: TagType, kind: PayloadKind, input: impl Into<String>) -> Self {
        Self {
            tag_type,
            kind,
            uid: None,
            input_file: None,
            input: Some(input.into()),
        }
    }

    /// Returns the tag type.
    #[must_use]
    pub const fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// Returns the payload kind.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Returns the inline payload text, if any.
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Pins the UID instead of generating one.
    #[must_use]
    pub fn with_uid(mut self, uid: TagUid) -> Self {
        self.uid = Some(uid);
        self
    }

    pub(crate) fn to_request(&self) -> Result<ImageRequest> {
        let input = match (&self.input, &self.input_file) {
            (Some(_), Some(_)) => return Err(CliConfigError::ConflictingInput.into()),
            (None, None) => return Err(CliConfigError::MissingInput.into()),
            (Some(input), None) => input.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read payload file `{}`", path.display()))?,
        };

        Ok(ImageRequest::builder()
            .tag_type(self.tag_type)
            .kind(self.kind)
            .input(input)
            .maybe_uid(self.uid)
            .build())
    }
}

/// Arguments for the `generate` command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    payload: PayloadArgs,
    /// Writes the image to this file instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl GenerateArgs {
    /// Creates `generate` arguments.
    #[must_use]
    pub fn new(payload: PayloadArgs) -> Self {
        Self {
            payload,
            output: None,
        }
    }

    /// Writes the image to `path` instead of stdout.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

#[derive(Serialize)]
struct GenerateResult<'a> {
    tag_type: TagType,
    uid: String,
    pages: usize,
    file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

/// Executes the `generate` command.
#[instrument(skip(args, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) fn run<W>(
    args: &GenerateArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let request = args.payload.to_request()?;
    let image = TagImage::generate(&request)?;
    let rendered = image.render();
    let file_name = suggested_file_name(request.kind(), request.input());

    if let Some(path) = &args.output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("failed to write tag image to `{}`", path.display()))?;
        debug!(path = %path.display(), bytes = rendered.len(), "tag image written");
    }

    match output_format {
        OutputFormat::Pretty => match &args.output {
            Some(path) => {
                let painter = Painter::new(terminal_client.stdout_is_terminal());
                writeln!(
                    out,
                    "{}",
                    TagImageView::new(&image, &path.display().to_string(), &painter)
                )?;
            }
            None => write!(out, "{rendered}")?,
        },
        OutputFormat::Json => {
            let result = GenerateResult {
                tag_type: image.profile().tag_type(),
                uid: image.uid().to_string(),
                pages: image.pages().len(),
                file_name,
                written_to: args
                    .output
                    .as_ref()
                    .map(|path| path.display().to_string()),
                content: args.output.is_none().then_some(rendered.as_str()),
            };
            serde_json::to_writer_pretty(&mut *out, &result)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
