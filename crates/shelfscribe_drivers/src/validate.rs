//! Request-shape validation shared by the HTTP surface and the drivers themselves
//! (§4.G, §7). Validation never touches Session state: a rejected request never
//! transitions a Job.

use serde::Deserialize;
use shelfscribe_protocol::{
    ErrorCode, MAX_AUTHOR_LEN, MAX_BOOKS_PER_BATCH, MAX_IMAGES_PER_SCAN, MAX_IMAGE_DECODED_BYTES,
    MAX_ISBN_LEN, MAX_TITLE_LEN,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookInput {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() { None } else { Some(v) }
    })
}

/// Validate and trim a batch_enrichment request body.
pub fn validate_batch(books: Vec<BookInput>) -> Result<Vec<BookInput>, ErrorCode> {
    if books.is_empty() {
        return Err(ErrorCode::EEmptyBatch);
    }
    if books.len() > MAX_BOOKS_PER_BATCH {
        return Err(ErrorCode::EBatchTooLarge);
    }

    let mut cleaned = Vec::with_capacity(books.len());
    for book in books {
        let title = book.title.trim().to_string();
        if title.is_empty() {
            return Err(ErrorCode::EInvalidRequest);
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(ErrorCode::ETitleTooLong);
        }
        let author = trimmed(book.author);
        if let Some(author) = &author {
            if author.len() > MAX_AUTHOR_LEN {
                return Err(ErrorCode::EAuthorTooLong);
            }
        }
        let isbn = trimmed(book.isbn);
        if let Some(isbn) = &isbn {
            if isbn.len() > MAX_ISBN_LEN {
                return Err(ErrorCode::EIsbnTooLong);
            }
        }
        cleaned.push(BookInput { title, author, isbn });
    }
    Ok(cleaned)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub index: usize,
    /// Base64-encoded image payload, as received over the wire.
    pub data: String,
}

/// Validate a shelf_scan request: `1..=5` images, each decoding to at most
/// `MAX_IMAGE_DECODED_BYTES` without ever allocating the decoded buffer
/// (base64 expands by 4/3, so the encoded length bounds the decoded one).
///
/// Count/shape problems are `E_INVALID_IMAGES` (400); an individual oversize image is
/// `E_IMAGE_TOO_LARGE` (413) — distinct codes because the client needs to tell "send
/// fewer/different images" from "this one image is too big" apart.
pub fn validate_images(images: &[ImageInput]) -> Result<(), ErrorCode> {
    if images.is_empty() || images.len() > MAX_IMAGES_PER_SCAN {
        return Err(ErrorCode::EInvalidImages);
    }
    for image in images {
        let estimated_decoded = image.data.len() / 4 * 3;
        if estimated_decoded > MAX_IMAGE_DECODED_BYTES {
            return Err(ErrorCode::EImageTooLarge);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_batch() {
        assert_eq!(validate_batch(vec![]), Err(ErrorCode::EEmptyBatch));
    }

    #[test]
    fn trims_and_accepts_valid_batch() {
        let input = vec![BookInput {
            title: "  The Hobbit  ".into(),
            author: Some("  J.R.R. Tolkien ".into()),
            isbn: None,
        }];
        let cleaned = validate_batch(input).unwrap();
        assert_eq!(cleaned[0].title, "The Hobbit");
        assert_eq!(cleaned[0].author.as_deref(), Some("J.R.R. Tolkien"));
    }

    #[test]
    fn rejects_title_over_limit() {
        let input = vec![BookInput {
            title: "x".repeat(MAX_TITLE_LEN + 1),
            author: None,
            isbn: None,
        }];
        assert_eq!(validate_batch(input), Err(ErrorCode::ETitleTooLong));
    }

    #[test]
    fn rejects_too_many_images() {
        let images: Vec<ImageInput> = (0..6).map(|i| ImageInput { index: i, data: "AAAA".into() }).collect();
        assert_eq!(validate_images(&images), Err(ErrorCode::EInvalidImages));
    }

    #[test]
    fn rejects_oversize_image_with_413_code() {
        let oversized_len = (MAX_IMAGE_DECODED_BYTES + 1) * 4 / 3 + 4;
        let images = vec![ImageInput { index: 0, data: "A".repeat(oversized_len) }];
        assert_eq!(validate_images(&images), Err(ErrorCode::EImageTooLarge));
    }
}
