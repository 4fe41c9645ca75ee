//! License key email.

use crate::sender::EmailMessage;
use chrono::Datelike;

/// Escapes text for inclusion in HTML.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the email that delivers a freshly issued license key.
#[must_use]
pub fn license_key_email(order_code: &str, license_key: &str) -> EmailMessage {
    EmailMessage {
        subject: format!("Empire Run - Your license key ({order_code})"),
        html: license_key_html(order_code, license_key, chrono::Utc::now().year()),
        text: license_key_text(order_code, license_key),
    }
}

fn license_key_html(order_code: &str, license_key: &str, year: i32) -> String {
    let order_code = escape_html(order_code);
    let license_key = escape_html(license_key);
    format!(
        r#"<html>
<head>
  <meta charset="UTF-8">
  <title>Empire Run - License Key</title>
</head>
<body style="margin:0;padding:0;background-color:#7b0000;">
  <div style="max-width:640px;margin:0 auto;padding:24px;font-family:'Segoe UI',Arial,sans-serif;">
    <div style="background:linear-gradient(135deg,#b30000,#ff3300);padding:24px 16px;text-align:center;border-radius:4px 4px 0 0;">
      <h1 style="margin:0 0 12px 0;font-size:18px;text-transform:uppercase;letter-spacing:2px;color:#ffd966;">LICENSE KEY ISSUED</h1>
      <div style="margin-top:8px;font-size:12px;color:#ffe9b3;letter-spacing:2px;text-transform:uppercase;">Workers of the world, unite!</div>
    </div>
    <div style="background-color:#1b0f0f;padding:20px 16px;border-radius:0 0 4px 4px;color:#fbead1;">
      <p style="margin:0 0 12px 0;font-size:14px;line-height:1.6;text-align:center;">
        Comrade, your payment has been confirmed.<br/>
        Below is your <strong>Empire Run License Key</strong>.
      </p>
      <div style="margin:10px 0 18px 0;font-size:12px;color:#e6cbb0;text-align:center;">
        Order Code: <strong style="color:#ffffff;">{order_code}</strong>
      </div>
      <div style="margin:20px auto 16px auto;max-width:360px;border:2px solid #ffd966;padding:12px 16px;text-align:center;background-color:#660000;">
        <div style="font-size:11px;text-transform:uppercase;letter-spacing:2px;color:#ffd966;margin-bottom:6px;">Your license key</div>
        <div style="font-size:22px;font-weight:900;letter-spacing:3px;color:#ffffff;">{license_key}</div>
      </div>
      <p style="margin:0 0 8px 0;font-size:13px;text-align:center;">How to activate:</p>
      <ul style="margin:8px auto 14px auto;max-width:520px;font-size:12px;line-height:1.6;">
        <li>Open the game and go to <strong>Activate Key</strong>.</li>
        <li>Paste the key above and press <strong>Activate</strong>.</li>
        <li>Keep this email for future reference.</li>
      </ul>
      <p style="margin:16px 0 0 0;font-size:11px;color:#e6cbb0;text-align:center;">
        If you didn't request this purchase, please reply to this email.
      </p>
    </div>
    <div style="margin-top:12px;text-align:center;font-size:10px;color:#f5d6b0;">
      &copy; {year} Empire Run &middot; All rights reserved.
    </div>
  </div>
</body>
</html>"#
    )
}

fn license_key_text(order_code: &str, license_key: &str) -> String {
    format!(
        "Empire Run - License Key\n\
         \n\
         Order Code: {order_code}\n\
         Your license key: {license_key}\n\
         \n\
         How to activate:\n\
         1) Open the game -> Activate Key\n\
         2) Paste the key and press Activate\n\
         \n\
         If you didn't request this purchase, please reply to this email.\n"
    )
}
