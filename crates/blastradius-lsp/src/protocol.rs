//! JSON-RPC-over-stdio framing: `Content-Length: N\r\n\r\n<body>` (§4.C).

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

pub fn encode_message(body: &str) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n{}", body.as_bytes().len(), body).into_bytes()
}

/// Read one Content-Length-framed message body from `reader`. Returns
/// `None` on clean EOF.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> std::io::Result<Option<String>> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some(rest) = trimmed.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = rest.trim().parse().ok();
        }
    }

    let Some(len) = content_length else {
        return Ok(Some(String::new()));
    };

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_framed_message() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        let framed = encode_message(body);
        let mut reader = BufReader::new(&framed[..]);
        let read_back = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(read_back, body);
    }

    #[tokio::test]
    async fn returns_none_on_eof() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }
}
