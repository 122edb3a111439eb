//! IMAP transport and session operations
//!
//! Provides timeout-bounded wrappers around the `async-imap` calls the inbox
//! fetcher needs. Connections are TLS-only; timeouts come from
//! [`ImapConfig`].

use std::sync::Arc;
use std::time::Duration;

use async_imap::types::Fetch;
use async_imap::{Client, Session};
use futures::TryStreamExt;
use rustls::ClientConfig;
use rustls::RootCertStore;
use rustls_pki_types::ServerName;
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::config::ImapConfig;
use crate::errors::{AppError, AppResult};

/// Authenticated IMAP session over TLS
pub type ImapSession = Session<tokio_rustls::client::TlsStream<TcpStream>>;

fn socket_timeout(config: &ImapConfig) -> Duration {
    Duration::from_millis(config.socket_timeout_ms)
}

/// Open a TLS session to the configured server and log in
///
/// Each phase (TCP, TLS handshake, greeting, LOGIN) has its own timeout.
/// The server certificate is always verified against the webpki roots.
///
/// # Errors
///
/// - `Timeout` if a phase does not finish in time
/// - `AuthFailed` if the server refuses the credentials
/// - `MailAccess` for transport, handshake or greeting failures
pub async fn connect_authenticated(config: &ImapConfig) -> AppResult<ImapSession> {
    let handshake = Duration::from_millis(config.greeting_timeout_ms);
    let tls_stream = open_tls(config, handshake).await?;

    let mut client = Client::new(tls_stream);
    match timeout(handshake, client.read_response()).await {
        Err(_) => return Err(AppError::Timeout("no IMAP greeting from server".to_owned())),
        Ok(Err(e)) => return Err(AppError::MailAccess(format!("unreadable IMAP greeting: {e}"))),
        Ok(Ok(None)) => {
            return Err(AppError::MailAccess(
                "connection closed before IMAP greeting".to_owned(),
            ));
        }
        Ok(Ok(Some(_))) => {}
    }

    match timeout(
        handshake,
        client.login(config.user.as_str(), config.pass.expose_secret()),
    )
    .await
    {
        Err(_) => Err(AppError::Timeout("LOGIN did not complete".to_owned())),
        Ok(Err((e, _client))) => Err(login_error(e)),
        Ok(Ok(session)) => Ok(session),
    }
}

/// TCP connect followed by the rustls handshake
async fn open_tls(
    config: &ImapConfig,
    handshake: Duration,
) -> AppResult<tokio_rustls::client::TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|_| AppError::MailAccess(format!("'{}' is not a valid TLS name", config.host)))?;

    let tcp = match timeout(
        Duration::from_millis(config.connect_timeout_ms),
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await
    {
        Err(_) => return Err(AppError::Timeout(format!("connecting to {}", config.host))),
        Ok(Err(e)) => {
            return Err(AppError::MailAccess(format!(
                "cannot reach {}:{}: {e}",
                config.host, config.port
            )));
        }
        Ok(Ok(tcp)) => tcp,
    };

    match timeout(handshake, tls_connector().connect(server_name, tcp)).await {
        Err(_) => Err(AppError::Timeout("TLS handshake did not complete".to_owned())),
        Ok(Err(e)) => Err(AppError::MailAccess(format!("TLS handshake rejected: {e}"))),
        Ok(Ok(stream)) => Ok(stream),
    }
}

fn tls_connector() -> TlsConnector {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let tls = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(tls))
}

/// Classify a failed LOGIN
///
/// A tagged `NO` is the server refusing the credentials. Anything else is a
/// protocol or transport problem.
fn login_error(e: async_imap::error::Error) -> AppError {
    match e {
        async_imap::error::Error::No(reason) => {
            AppError::AuthFailed(format!("server refused login: {reason}"))
        }
        async_imap::error::Error::Validate(_) => {
            AppError::AuthFailed("credentials contain characters IMAP cannot quote".to_owned())
        }
        other => AppError::MailAccess(format!("LOGIN failed: {other}")),
    }
}

/// Select mailbox in read-only mode
///
/// Uses `EXAMINE` so fetched messages keep their `\Seen` state.
pub async fn select_mailbox_readonly(
    config: &ImapConfig,
    session: &mut ImapSession,
    mailbox: &str,
) -> AppResult<()> {
    timeout(socket_timeout(config), session.examine(mailbox))
        .await
        .map_err(|_| AppError::Timeout(format!("EXAMINE timed out for mailbox '{mailbox}'")))
        .and_then(|r| {
            r.map_err(|e| AppError::MailAccess(format!("cannot examine mailbox '{mailbox}': {e}")))
        })?;
    Ok(())
}

/// Search for messages matching query
///
/// Runs `UID SEARCH` and returns matching UIDs newest first.
pub async fn uid_search(
    config: &ImapConfig,
    session: &mut ImapSession,
    query: &str,
) -> AppResult<Vec<u32>> {
    let set = timeout(socket_timeout(config), session.uid_search(query))
        .await
        .map_err(|_| AppError::Timeout("UID SEARCH timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::MailAccess(format!("uid search failed: {e}"))))?;
    let mut uids: Vec<u32> = set.into_iter().collect();
    uids.sort_unstable_by(|a, b| b.cmp(a));
    Ok(uids)
}

/// Fetch a single message with custom query
///
/// # Errors
///
/// - `MailAccess` if the UID does not exist or the fetch fails
/// - `Timeout` if the command or its response stream times out
async fn fetch_one(
    config: &ImapConfig,
    session: &mut ImapSession,
    uid: u32,
    query: &str,
) -> AppResult<Fetch> {
    let stream = timeout(
        socket_timeout(config),
        session.uid_fetch(uid.to_string(), query),
    )
    .await
    .map_err(|_| AppError::Timeout("UID FETCH timed out".to_owned()))
    .and_then(|r| r.map_err(|e| AppError::MailAccess(format!("uid fetch failed: {e}"))))?;
    let fetches: Vec<Fetch> = timeout(socket_timeout(config), stream.try_collect())
        .await
        .map_err(|_| AppError::Timeout("UID FETCH stream timed out".to_owned()))
        .and_then(|r| {
            r.map_err(|e| AppError::MailAccess(format!("uid fetch stream failed: {e}")))
        })?;

    fetches
        .into_iter()
        .next()
        .ok_or_else(|| AppError::MailAccess(format!("message uid {uid} not found")))
}

/// Fetch full RFC822 message source without setting `\Seen`
pub async fn fetch_message_peek(
    config: &ImapConfig,
    session: &mut ImapSession,
    uid: u32,
) -> AppResult<Vec<u8>> {
    let fetch = fetch_one(config, session, uid, "BODY.PEEK[]").await?;
    let body = fetch
        .body()
        .ok_or_else(|| AppError::MailAccess("message has no body".to_owned()))?;
    Ok(body.to_vec())
}

/// Close the session with `LOGOUT`
pub async fn logout(config: &ImapConfig, session: &mut ImapSession) -> AppResult<()> {
    timeout(socket_timeout(config), session.logout())
        .await
        .map_err(|_| AppError::Timeout("LOGOUT timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::MailAccess(format!("LOGOUT failed: {e}"))))
}

#[cfg(test)]
mod tests {
    use async_imap::error::{Error, ValidateError};

    use super::login_error;

    #[test]
    fn refused_login_is_an_auth_failure() {
        let err = login_error(Error::No("[AUTHENTICATIONFAILED] bad password".to_owned()));
        assert_eq!(err.code(), "auth_failed");
        assert!(err.to_string().contains("bad password"));
    }

    #[test]
    fn unquotable_credentials_are_an_auth_failure() {
        assert_eq!(login_error(Error::Validate(ValidateError('\n'))).code(), "auth_failed");
    }

    #[test]
    fn protocol_errors_stay_mail_access() {
        let err = login_error(Error::Bad("command unknown".to_owned()));
        assert_eq!(err.code(), "mail_access");
        assert_eq!(login_error(Error::ConnectionLost).code(), "mail_access");
    }
}
