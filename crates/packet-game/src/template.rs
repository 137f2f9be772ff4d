use serde::Serialize;

use crate::notify::PacketNotice;

/// A rendered email, ready for a mail relay.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub fn subject(is_ultra_rare: bool) -> &'static str {
    if is_ultra_rare {
        "\u{1F389} ULTRA-RARE! Your Mystery Packet!"
    } else {
        "\u{1F4E6} Your Daily Mystery Packet"
    }
}

pub fn render(notice: &PacketNotice, from: &str, app_url: &str) -> EmailMessage {
    let reward = &notice.reward;
    let name_color = if notice.is_ultra_rare { "#ffd700" } else { "#667eea" };
    let rare_banner = if notice.is_ultra_rare {
        r#"<div style="color: #ffd700; font-weight: bold; font-size: 18px; margin-top: 20px;">ULTRA-RARE! 1 in 1,000!</div>"#
    } else {
        ""
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; background: #f5f5f5;">
  <div style="max-width: 500px; margin: 40px auto; background: white; border-radius: 16px; padding: 40px; text-align: center;">
    <h1 style="color: #333;">Your Mystery Packet Arrived!</h1>
    <h2>You found...</h2>
    <div style="font-size: 120px; margin: 20px 0;">{glyph}</div>
    <div style="font-size: 32px; font-weight: bold; color: {name_color};">{name}</div>
    <div style="color: #666; font-size: 16px; margin-bottom: 30px;">{desc}</div>
    {rare_banner}
    <a href="{app_url}" style="display: inline-block; padding: 12px 30px; background: #667eea; color: white; text-decoration: none; border-radius: 8px;">View Your Collection</a>
    <p style="color: #999; font-size: 12px; margin-top: 40px;">Come back tomorrow for another packet!</p>
  </div>
</body>
</html>"#,
        glyph = reward.glyph,
        name = escape_html(&reward.name),
        desc = escape_html(&reward.description),
        app_url = escape_html(app_url),
    );

    EmailMessage {
        from: from.to_string(),
        to: notice.email.clone(),
        subject: subject(notice.is_ultra_rare).to_string(),
        html,
    }
}

fn escape_html(s: &str) -> String {
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
