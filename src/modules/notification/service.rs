use crate::{modules::user::repository::User, types::Context};
use lettre::{message::header::ContentType, AsyncTransport, Message};
use std::sync::Arc;

pub enum Error {
    NotSent,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub enum NotificationType {
    EmailVerificationRequested { code: String },
}

#[derive(Clone)]
pub struct Notification {
    pub type_: NotificationType,
    pub recipient: User,
}

impl Notification {
    pub fn email_verification_requested(user: User, code: String) -> Self {
        Self {
            type_: NotificationType::EmailVerificationRequested { code },
            recipient: user,
        }
    }
}

pub async fn send(ctx: Arc<Context>, notification: Notification) -> Result<()> {
    let (subject, body) = match &notification.type_ {
        NotificationType::EmailVerificationRequested { code } => (
            "Verify your email".to_string(),
            format!(
                "Hello!\n\nPlease verify your email address. Your code is {code}.\n\nOr follow this link: {url}/confirm?code={code}\n",
                code = code,
                url = ctx.app.url,
            ),
        ),
    };

    let email = Message::builder()
        .from(
            format!(
                "{} <{}>",
                ctx.mail.sender_name.clone(),
                ctx.mail.sender_email.clone()
            )
            .parse()
            .map_err(|err| {
                tracing::error!("Invalid mail sender address: {}", err);
                Error::NotSent
            })?,
        )
        .to(notification.recipient.email.parse().map_err(|err| {
            tracing::error!("Invalid mail recipient address: {}", err);
            Error::NotSent
        })?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|err| {
            tracing::error!("Failed to build email: {}", err);
            Error::NotSent
        })?;

    match ctx.mail.transport.send(email).await {
        Ok(_) => Ok(()),
        Err(err) => {
            tracing::error!("Failed to send email: {:?}", err);
            Err(Error::NotSent)
        }
    }
}
