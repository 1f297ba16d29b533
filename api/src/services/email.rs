//! SMTP email delivery for absence notices.
//!
//! Uses a lazily initialized async SMTP transport configured for Gmail from
//! `util::config` (`GMAIL_USERNAME`, `GMAIL_APP_PASSWORD`, `EMAIL_FROM_NAME`).

use chrono::NaiveDate;
use lettre::{
    AsyncTransport, Tokio1Executor,
    message::{Message, MultiPart, SinglePart, header},
    transport::smtp::{
        AsyncSmtpTransport,
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use once_cell::sync::Lazy;
use util::config;

static SMTP_CLIENT: Lazy<AsyncSmtpTransport<Tokio1Executor>> = Lazy::new(|| {
    let username = config::gmail_username();
    let password = config::gmail_app_password();

    let tls_parameters = TlsParameters::new("smtp.gmail.com".to_string())
        .expect("Failed to create TLS parameters");

    AsyncSmtpTransport::<Tokio1Executor>::relay("smtp.gmail.com")
        .expect("Failed to create SMTP transport")
        .port(587)
        .tls(Tls::Required(tls_parameters))
        .credentials(Credentials::new(username, password))
        .build()
});

/// Service for handling email-related operations.
pub struct EmailService;

impl EmailService {
    /// Sends one absence notice. Fire-and-forget per recipient: the caller
    /// logs and skips failures, it never aborts the batch on one of them.
    pub async fn send_absence_email(
        to_email: &str,
        username: &str,
        class_code: &str,
        session_day: NaiveDate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let from_email = config::gmail_username();
        let from_name = config::email_from_name();

        let email = Message::builder()
            .from(format!("{} <{}>", from_name, from_email).parse()?)
            .to(to_email.parse()?)
            .subject(format!(
                "Absence recorded for {} on {}",
                class_code, session_day
            ))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(format!(
                                "Hello {},\n\n\
                                You were marked absent for {} on {}.\n\n\
                                If you believe this is a mistake, please contact your teacher \
                                so your attendance can be reviewed.\n\n\
                                Best regards,\n\
                                {}",
                                username, class_code, session_day, from_name
                            )),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(format!(
                                "<html>\
                                <body>\
                                <p>Hello {},</p>\
                                <p>You were marked <strong>absent</strong> for {} on {}.</p>\
                                <p>If you believe this is a mistake, please contact your teacher \
                                so your attendance can be reviewed.</p>\
                                <p>Best regards,<br>{}</p>\
                                </body>\
                                </html>",
                                username, class_code, session_day, from_name
                            )),
                    ),
            )?;

        SMTP_CLIENT.send(email).await?;
        Ok(())
    }
}
