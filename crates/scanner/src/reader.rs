use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read size for streaming digests of files that are never decoded.
const DIGEST_CHUNK_BYTES: usize = 64 * 1024;

/// Outcome of decoding one file's bytes as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextContent {
    Text(String),
    Unreadable(String),
}

/// Bytes of one file plus their digest; the digest feeds the tree fingerprint.
#[derive(Debug)]
pub struct FileBytes {
    pub bytes: Vec<u8>,
    pub digest: [u8; 32],
}

/// Decoded content of one file and the digest of its bytes.
#[derive(Debug)]
pub struct LoadedFile {
    pub content: TextContent,
    pub digest: [u8; 32],
}

pub async fn read_file_bytes(path: &Path) -> std::io::Result<FileBytes> {
    let bytes = tokio::fs::read(path).await?;
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    Ok(FileBytes { bytes, digest })
}

/// SHA-256 of a file read in fixed-size chunks, without buffering the whole file.
pub async fn digest_file(path: &Path) -> std::io::Result<[u8; 32]> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; DIGEST_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.finalize().into())
}

fn oversized(len: u64, max_text_bytes: u64) -> TextContent {
    TextContent::Unreadable(format!(
        "file is {len} bytes, above the {max_text_bytes} byte text limit"
    ))
}

/// Stats the file first: over-limit files are only streamed through the digest, everything
/// else is read once and decoded. I/O errors become [`TextContent::Unreadable`].
pub async fn load_file(path: &Path, max_text_bytes: u64) -> LoadedFile {
    let unreadable = |e: std::io::Error| LoadedFile {
        content: TextContent::Unreadable(e.to_string()),
        digest: [0u8; 32],
    };
    let len = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) => return unreadable(e),
    };
    if len > max_text_bytes {
        return match digest_file(path).await {
            Ok(digest) => LoadedFile {
                content: oversized(len, max_text_bytes),
                digest,
            },
            Err(e) => unreadable(e),
        };
    }
    match read_file_bytes(path).await {
        Ok(bytes) => LoadedFile {
            content: decode_text(bytes.bytes, max_text_bytes),
            digest: bytes.digest,
        },
        Err(e) => unreadable(e),
    }
}

/// Decodes bytes as UTF-8 text, rejecting binary content and oversized files.
pub fn decode_text(bytes: Vec<u8>, max_text_bytes: u64) -> TextContent {
    let len = bytes.len() as u64;
    if len > max_text_bytes {
        return oversized(len, max_text_bytes);
    }
    if bytes.contains(&0) {
        return TextContent::Unreadable("binary content (NUL bytes)".to_string());
    }
    match String::from_utf8(bytes) {
        Ok(mut text) => {
            if text.starts_with('\u{feff}') {
                text.drain(..'\u{feff}'.len_utf8());
            }
            TextContent::Text(text)
        }
        Err(_) => TextContent::Unreadable("content is not valid UTF-8 text".to_string()),
    }
}

pub fn count_lines(text: &str) -> usize {
    text.lines().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_plain_text_and_strips_bom() {
        let decoded = decode_text(b"\xef\xbb\xbfline one\nline two\n".to_vec(), 1024);
        assert_eq!(decoded, TextContent::Text("line one\nline two\n".to_string()));
        assert_eq!(count_lines("line one\nline two\n"), 2);
        assert_eq!(count_lines(""), 0);
    }

    #[test]
    fn rejects_binary_invalid_and_oversized() {
        assert!(matches!(
            decode_text(vec![b'a', 0, b'b'], 1024),
            TextContent::Unreadable(_)
        ));
        assert!(matches!(
            decode_text(vec![0xff, 0xfe, 0xfd], 1024),
            TextContent::Unreadable(_)
        ));
        assert!(matches!(
            decode_text(vec![b'a'; 16], 8),
            TextContent::Unreadable(_)
        ));
    }

    #[tokio::test]
    async fn digest_depends_on_content() {
        let temp = tempfile::tempdir().unwrap();
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        std::fs::write(&a, b"same").unwrap();
        std::fs::write(&b, b"other").unwrap();
        let first = read_file_bytes(&a).await.unwrap();
        let again = read_file_bytes(&a).await.unwrap();
        let second = read_file_bytes(&b).await.unwrap();
        assert_eq!(first.digest, again.digest);
        assert_ne!(first.digest, second.digest);
    }

    #[tokio::test]
    async fn oversized_files_are_streamed_not_decoded() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clip.bin");
        // NUL bytes would be reported as binary if the bytes were ever decoded.
        let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 7) as u8).collect();
        std::fs::write(&path, &bytes).unwrap();

        let loaded = load_file(&path, 1024).await;

        match loaded.content {
            TextContent::Unreadable(reason) => {
                assert_eq!(
                    reason,
                    "file is 200000 bytes, above the 1024 byte text limit"
                );
            }
            other => panic!("expected unreadable, got {other:?}"),
        }
        let whole: [u8; 32] = Sha256::digest(&bytes).into();
        assert_eq!(loaded.digest, whole);
        assert_eq!(digest_file(&path).await.unwrap(), whole);
    }

    #[tokio::test]
    async fn small_files_are_decoded() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("app.py");
        std::fs::write(&path, b"print('hi')\n").unwrap();

        let loaded = load_file(&path, 1024).await;
        assert_eq!(loaded.content, TextContent::Text("print('hi')\n".to_string()));

        let missing = load_file(&temp.path().join("gone.py"), 1024).await;
        assert!(matches!(missing.content, TextContent::Unreadable(_)));
    }
}
