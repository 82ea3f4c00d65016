use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

/// Outbound mail seam. The core never composes rich content; it hands a
/// recipient and a token-bearing link to the provider.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_password_reset(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError>;

    async fn send_verification(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError>;

    async fn send_magic_link(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError>;

    async fn send_account_unlock(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError>;

    async fn send_invitation(
        &self,
        to_email: &str,
        token: &str,
        team_name: &str,
        base_url: &str,
    ) -> Result<(), AppError>;
}

/// SMTP-backed provider.
#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &crate::config::SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }

    async fn send_email(&self, to_email: &str, subject: &str, body: String) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        AppError::InternalError(e.into())
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send in the blocking pool; SmtpTransport is synchronous.
        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_password_reset(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/auth/reset-password?token={}", base_url, token);
        self.send_email(
            to_email,
            "Reset your password",
            format!("Use the link below to reset your password:\n\n{}", link),
        )
        .await
    }

    async fn send_verification(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/auth/verify-email?token={}", base_url, token);
        self.send_email(
            to_email,
            "Verify your email address",
            format!("Confirm your email address by opening:\n\n{}", link),
        )
        .await
    }

    async fn send_magic_link(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/auth/magic-link/verify?token={}", base_url, token);
        self.send_email(
            to_email,
            "Your sign-in link",
            format!("Sign in by opening:\n\n{}", link),
        )
        .await
    }

    async fn send_account_unlock(
        &self,
        to_email: &str,
        token: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/auth/unlock-account?token={}", base_url, token);
        self.send_email(
            to_email,
            "Unlock your account",
            format!("Your account was locked after repeated failed sign-in attempts. Unlock it by opening:\n\n{}", link),
        )
        .await
    }

    async fn send_invitation(
        &self,
        to_email: &str,
        token: &str,
        team_name: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/invitations/{}", base_url, token);
        self.send_email(
            to_email,
            &format!("You have been invited to join {}", team_name),
            format!("Accept the invitation by opening:\n\n{}", link),
        )
        .await
    }
}

/// Email kind markers recorded by the mock provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentEmailKind {
    PasswordReset,
    Verification,
    MagicLink,
    AccountUnlock,
    Invitation,
}

/// A captured outbound email.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub kind: SentEmailKind,
    pub token: String,
}

/// Recording provider for tests.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<SentEmail>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, to: &str, kind: SentEmailKind, token: &str) {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            kind,
            token: token.to_string(),
        });
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Most recent token sent to `to` of the given kind.
    pub fn last_token(&self, to: &str, kind: SentEmailKind) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e.to == to && e.kind == kind)
            .map(|e| e.token.clone())
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_password_reset(
        &self,
        to_email: &str,
        token: &str,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, SentEmailKind::PasswordReset, token);
        Ok(())
    }

    async fn send_verification(
        &self,
        to_email: &str,
        token: &str,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, SentEmailKind::Verification, token);
        Ok(())
    }

    async fn send_magic_link(
        &self,
        to_email: &str,
        token: &str,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, SentEmailKind::MagicLink, token);
        Ok(())
    }

    async fn send_account_unlock(
        &self,
        to_email: &str,
        token: &str,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, SentEmailKind::AccountUnlock, token);
        Ok(())
    }

    async fn send_invitation(
        &self,
        to_email: &str,
        token: &str,
        _team_name: &str,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, SentEmailKind::Invitation, token);
        Ok(())
    }
}
