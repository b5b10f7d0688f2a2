#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Maps annotation quotes back onto the submission they were taken from.
//!
//! The result is a partition of the submission into ordered, contiguous,
//! non-overlapping [`DisplaySegment`]s. Joining every segment's text gives
//! back the submission exactly, whatever the annotations contain. Quotes that
//! cannot be found (paraphrased, hallucinated, or already covered by an
//! earlier annotation) are dropped from placement.

use colored::Colorize;

use crate::grade::results::{Annotation, AnnotationKind};

/// A contiguous slice of the submission, optionally covered by an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySegment<'a> {
    /// The slice of the submission.
    pub text:       &'a str,
    /// The annotation covering this slice, if any.
    pub annotation: Option<&'a Annotation>,
    /// Byte offset of `text` within the submission.
    pub start:      usize,
}

impl DisplaySegment<'_> {
    /// Byte offset one past the end of `text` within the submission.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Whether an annotation covers this segment.
    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }
}

/// Finds `quote` in `text` at or after byte offset `from`.
///
/// An empty quote never matches: it would only ever produce an empty
/// highlighted segment.
fn find_from(text: &str, quote: &str, from: usize) -> Option<usize> {
    if quote.is_empty() {
        return None;
    }
    text.get(from..)?.find(quote).map(|i| i + from)
}

/// Splits `text` into display segments for `annotations`.
///
/// Annotations are applied in order of where their quote first occurs in the
/// text. Each one is then matched at the next occurrence at or after the end
/// of the previous match, so a phrase quoted twice lands on two different
/// occurrences. An annotation with an empty quote is never placed, so no
/// segment is ever both annotated and empty. Pure and infallible.
pub fn place_annotations<'a>(
    text: &'a str,
    annotations: &'a [Annotation],
) -> Vec<DisplaySegment<'a>> {
    let mut ordered: Vec<(Option<usize>, &Annotation)> = annotations
        .iter()
        .map(|annotation| (find_from(text, &annotation.text, 0), annotation))
        .collect();
    // Stable: quotes that are never found sort first and are dropped below.
    ordered.sort_by_key(|(first, _)| *first);

    let mut segments = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut cursor = 0;

    for (_, annotation) in ordered {
        let Some(index) = find_from(text, &annotation.text, cursor) else {
            tracing::debug!("Dropping annotation, quote not found: {:?}", annotation.text);
            continue;
        };

        if index > cursor {
            segments.push(DisplaySegment {
                text:       &text[cursor..index],
                annotation: None,
                start:      cursor,
            });
        }

        let end = index + annotation.text.len();
        segments.push(DisplaySegment {
            text:       &text[index..end],
            annotation: Some(annotation),
            start:      index,
        });
        cursor = end;
    }

    if cursor < text.len() {
        segments.push(DisplaySegment {
            text:       &text[cursor..],
            annotation: None,
            start:      cursor,
        });
    }

    segments
}

/// Renders segments for a terminal: positive spans green, negative spans red,
/// each followed by a footnote marker, with the comments listed underneath.
pub fn render_ansi(segments: &[DisplaySegment<'_>]) -> String {
    let mut body = String::new();
    let mut notes = Vec::new();

    for segment in segments {
        match segment.annotation {
            None => body.push_str(segment.text),
            Some(annotation) => {
                notes.push(annotation);
                let marker = format!("[{}]", notes.len());
                let span = match annotation.kind {
                    AnnotationKind::Positive => segment.text.green().underline(),
                    AnnotationKind::Negative => segment.text.red().underline(),
                };
                body.push_str(&format!("{span}{}", marker.dimmed()));
            }
        }
    }

    if !notes.is_empty() {
        body.push_str("\n\n");
        for (i, annotation) in notes.iter().enumerate() {
            let label = match annotation.kind {
                AnnotationKind::Positive => "+".green(),
                AnnotationKind::Negative => "-".red(),
            };
            body.push_str(&format!("[{}] {label} {}\n", i + 1, annotation.comment));
        }
    }

    body
}
