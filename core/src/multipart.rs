//! `multipart/form-data` body encoding.
//!
//! The request builder stays free of I/O, so the create-book body is encoded
//! here into bytes up front rather than streamed by the transport.

use crate::types::Attachment;

/// One form field.
#[derive(Debug, Clone, Copy)]
pub enum Part<'a> {
    Text { name: &'a str, value: &'a str },
    File { name: &'a str, attachment: &'a Attachment },
}

/// Header value announcing a multipart body with `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Encode `parts` in order, delimited by `boundary`.
pub fn encode(boundary: &str, parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        escape(name)
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File { name, attachment } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        escape(name),
                        escape(&attachment.file_name),
                        attachment.content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&attachment.bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

// Percent-encode the characters that would break a quoted header parameter.
fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
