mod resend;
mod sendgrid;
mod smtp;

pub use resend::ResendProvider;
pub use sendgrid::SendGridProvider;
pub use smtp::SmtpProvider;
