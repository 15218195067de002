//! Download git repositories as tarballs from their hosting provider instead of cloning them.

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::canonical::CanonicalUrl;
use crate::error::Error;

/// A hosting provider that serves a tarball of a repository at any commit.
pub struct TarballHost {
    pub name: &'static str,
    matches: fn(host: &str) -> bool,
    url: fn(host: &str, owner: &str, repo: &str, commit: &str) -> String,
}

/// Known hosts, tried in order.
pub const TARBALL_HOSTS: &[TarballHost] = &[
    TarballHost {
        name: "github",
        matches: |host| host == "github.com",
        url: |_, owner, repo, commit| {
            format!("https://codeload.github.com/{owner}/{repo}/tar.gz/{commit}")
        },
    },
    TarballHost {
        name: "gitlab",
        matches: |host| host.split('.').next() == Some("gitlab"),
        url: |host, owner, repo, commit| {
            format!("https://{host}/{owner}/{repo}/-/archive/{commit}/{repo}-{commit}.tar.gz")
        },
    },
    TarballHost {
        name: "bitbucket",
        matches: |host| host == "bitbucket.org",
        url: |host, owner, repo, commit| format!("https://{host}/{owner}/{repo}/get/{commit}.tar.gz"),
    },
];

/// The tarball URL for `repo` at `commit`. The repository must be hosted by one of
/// [`TARBALL_HOSTS`] at an `owner/repo` path.
pub fn tarball_url(repo: &CanonicalUrl, commit: &str) -> Result<String, Error> {
    let unsupported = || Error::UnsupportedHost {
        url: repo.to_string(),
    };
    let segments = repo.segments().collect::<Vec<_>>();
    let [owner, name] = segments[..] else {
        return Err(unsupported());
    };
    TARBALL_HOSTS
        .iter()
        .find(|h| (h.matches)(repo.host()))
        .map(|h| {
            debug!("Using {} tarball for {repo}", h.name);
            (h.url)(repo.host(), owner, name, commit)
        })
        .ok_or_else(unsupported)
}

/// Hash the content at `url` with sha256, streaming the response body.
pub async fn remote_sha256(client: &reqwest::Client, url: &str) -> Result<String, Error> {
    info!("started sha256({url})");
    let mut response = client.get(url).send().await?.error_for_status()?;
    let mut hasher = Sha256::new();
    while let Some(chunk) = response.chunk().await? {
        hasher.update(&chunk);
    }
    info!("done sha256({url})");
    Ok(format!("{:x}", hasher.finalize()))
}


#[cfg(test)]
mod test_remote_sha256 {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Answer one HTTP request with `status` and `body`, returning the URL to request.
    async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let header = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/foo/bar/tar.gz/0123456")
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn hashes_the_whole_body() {
        // Large enough to arrive in several chunks
        let body = (0..200_000u32).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        let expected = format!("{:x}", Sha256::digest(&body));
        let url = serve_once("200 OK", body).await;
        assert_eq!(remote_sha256(&client(), &url).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn error_status_fails() {
        let url = serve_once("404 Not Found", Vec::new()).await;
        assert!(matches!(
            remote_sha256(&client(), &url).await,
            Err(Error::Reqwest(err)) if err.status() == Some(reqwest::StatusCode::NOT_FOUND)
        ));
    }
}
