//! Campaign template renderer - personalizes the campaign HTML

use mailbatch_storage::models::Lead;
use regex::Regex;

use crate::engine::CampaignContent;

/// Built-in campaign document. Campaign content fills the title, body,
/// call-to-action, and contact slots; the recipient fills the
/// greeting.
const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <style>
      body { font-family: Arial, Helvetica, sans-serif; color: #333333; margin: 0; }
      .header { background-color: #1a5276; color: #ffffff; padding: 16px 24px; }
      .container { max-width: 600px; margin: 0 auto; padding: 24px; }
      .cta { display: inline-block; background-color: #1a5276; color: #ffffff; padding: 12px 24px; text-decoration: none; border-radius: 4px; }
      .footer { font-size: 12px; color: #888888; border-top: 1px solid #eeeeee; margin-top: 24px; padding-top: 12px; }
    </style>
  </head>
  <body>
    <div class="header"><h2>{{title}}</h2></div>
    <div class="container">
      <p>Dear {{first_name}},</p>
      <div>{{body}}</div>
      {{cta_block}}
      <div class="footer">{{contact_block}}</div>
    </div>
  </body>
</html>"#;

/// Renders the campaign document for one recipient
#[derive(Debug, Clone, Default)]
pub struct CampaignRenderer;

impl CampaignRenderer {
    /// Create a new renderer
    pub fn new() -> Self {
        Self
    }

    /// Render the campaign HTML for a recipient
    pub fn render(&self, lead: &Lead, content: &CampaignContent) -> String {
        let mut result = DEFAULT_TEMPLATE.to_string();

        result = result.replace("{{title}}", &content.title);
        result = result.replace("{{body}}", &content.body);

        // Split name into first/last (simple heuristic)
        let parts: Vec<&str> = lead.name.split_whitespace().collect();
        let first_name = parts.first().copied().unwrap_or("");
        result = result.replace(
            "{{first_name}}",
            if first_name.is_empty() { "there" } else { first_name },
        );
        result = result.replace("{{name}}", &lead.name);

        let cta_block = match (&content.cta_text, &content.cta_link) {
            (Some(text), Some(link)) => {
                format!(r#"<p><a class="cta" href="{}">{}</a></p>"#, link, text)
            }
            _ => String::new(),
        };
        result = result.replace("{{cta_block}}", &cta_block);

        let mut contact_lines = Vec::new();
        if let Some(email) = &content.contact_email {
            contact_lines.push(format!("Email: {}", email));
        }
        if let Some(phone) = &content.contact_phone {
            contact_lines.push(format!("Phone: {}", phone));
        }
        let contact_block = if contact_lines.is_empty() {
            String::new()
        } else {
            format!("<p>Questions? Reach us. {}</p>", contact_lines.join(" | "))
        };
        result = result.replace("{{contact_block}}", &contact_block);

        // Clean up any remaining placeholders
        self.remove_unused_placeholders(&result)
    }

    /// Remove unused placeholder variables
    fn remove_unused_placeholders(&self, content: &str) -> String {
        let re = Regex::new(r"\{\{[^}]+\}\}").unwrap();
        re.replace_all(content, "").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_lead() -> Lead {
        Lead {
            id: uuid::Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            message: None,
            created_at: Utc::now(),
        }
    }

    fn create_test_content() -> CampaignContent {
        CampaignContent {
            title: "Study in Canada".to_string(),
            body: "<p>Applications for the fall intake are open.</p>".to_string(),
            cta_text: Some("Book a consultation".to_string()),
            cta_link: Some("https://example.com/book".to_string()),
            contact_email: Some("hello@example.com".to_string()),
            contact_phone: Some("+1 555 0100".to_string()),
        }
    }

    #[test]
    fn test_render_personalizes_greeting() {
        let renderer = CampaignRenderer::new();
        let html = renderer.render(&create_test_lead(), &create_test_content());

        assert!(html.contains("Dear Ada,"));
        assert!(html.contains("Study in Canada"));
        assert!(html.contains("Applications for the fall intake are open."));
    }

    #[test]
    fn test_render_includes_cta_when_present() {
        let renderer = CampaignRenderer::new();
        let html = renderer.render(&create_test_lead(), &create_test_content());

        assert!(html.contains(r#"href="https://example.com/book""#));
        assert!(html.contains("Book a consultation"));
    }

    #[test]
    fn test_render_omits_cta_when_missing() {
        let renderer = CampaignRenderer::new();
        let mut content = create_test_content();
        content.cta_text = None;

        let html = renderer.render(&create_test_lead(), &content);
        assert!(!html.contains("class=\"cta\""));
        assert!(!html.contains("{{cta_block}}"));
    }

    #[test]
    fn test_render_contact_footer() {
        let renderer = CampaignRenderer::new();
        let html = renderer.render(&create_test_lead(), &create_test_content());

        assert!(html.contains("Email: hello@example.com"));
        assert!(html.contains("Phone: +1 555 0100"));
    }

    #[test]
    fn test_render_falls_back_for_empty_name() {
        let renderer = CampaignRenderer::new();
        let mut lead = create_test_lead();
        lead.name = "".to_string();

        let html = renderer.render(&lead, &create_test_content());
        assert!(html.contains("Dear there,"));
    }

    #[test]
    fn test_render_strips_leftover_placeholders() {
        let renderer = CampaignRenderer::new();
        let mut content = create_test_content();
        content.body = "Hello {{unknown_var}} world".to_string();

        let html = renderer.render(&create_test_lead(), &content);
        assert!(!html.contains("{{"));
        assert!(html.contains("Hello  world"));
    }
}
