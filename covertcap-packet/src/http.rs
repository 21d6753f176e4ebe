//! HTTP/1.1 request and response text carried in TCP payloads

/// An HTTP/1.1 request head (no body)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Header name/value pairs in wire order
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// A keep-alive GET with `Host`, optional `User-Agent`, `Accept`
    /// and `Connection` headers
    pub fn get(path: impl Into<String>, host: &str, user_agent: Option<&str>) -> Self {
        let mut headers = vec![("Host".to_string(), host.to_string())];
        if let Some(ua) = user_agent {
            headers.push(("User-Agent".to_string(), ua.to_string()));
        }
        headers.push(("Accept".to_string(), "*/*".to_string()));
        headers.push(("Connection".to_string(), "keep-alive".to_string()));

        Self {
            method: "GET".to_string(),
            path: path.into(),
            headers,
        }
    }

    /// Case-insensitive header lookup, first occurrence wins
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header("User-Agent")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut text = format!("{} {} HTTP/1.1\r\n", self.method, self.path);
        for (name, value) in &self.headers {
            text.push_str(name);
            text.push_str(": ");
            text.push_str(value);
            text.push_str("\r\n");
        }
        text.push_str("\r\n");
        text.into_bytes()
    }

    /// Parse a request head from a TCP payload
    ///
    /// Returns `None` unless the payload starts with a
    /// `<METHOD> <path> HTTP/1.x` line. Header lines without a colon are
    /// skipped; parsing stops at the first empty line.
    pub fn from_bytes(payload: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(payload);
        let mut lines = text.split("\r\n");

        let mut request_line = lines.next()?.split(' ');
        let method = request_line.next()?;
        let path = request_line.next()?;
        let version = request_line.next()?;
        if method.is_empty()
            || !method.bytes().all(|b| b.is_ascii_uppercase())
            || !version.starts_with("HTTP/1.")
        {
            return None;
        }

        let headers = lines
            .take_while(|line| !line.is_empty())
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        Some(Self {
            method: method.to_string(),
            path: path.to_string(),
            headers,
        })
    }
}

/// An HTTP/1.1 response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            reason: "OK".to_string(),
            body: body.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n\r\n",
            self.status,
            self.reason,
            self.body.len()
        )
        .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse the status line; the body is whatever follows the blank line
    pub fn from_bytes(payload: &[u8]) -> Option<Self> {
        let head_end = payload.windows(4).position(|w| w == b"\r\n\r\n")?;
        let head = String::from_utf8_lossy(&payload[..head_end]);
        let status_line = head.split("\r\n").next()?;

        let mut parts = status_line.splitn(3, ' ');
        if !parts.next()?.starts_with("HTTP/1.") {
            return None;
        }
        let status = parts.next()?.parse().ok()?;
        let reason = parts.next().unwrap_or("").to_string();

        Some(Self {
            status,
            reason,
            body: payload[head_end + 4..].to_vec(),
        })
    }
}
