//! HTTP xAPI binding for Cisco collaboration endpoints.
//!
//! Configuration writes and commands go to `POST /putxml` as small XML
//! documents; status reads go to `GET /getxml?location=...`. The codec
//! authenticates requests with HTTP Basic against a local user account.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::surface::DeviceSurface;

/// First `<Number>` element of the contact-info status document.
static NUMBER_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Number>([^<]+)</Number>").unwrap());

pub struct XapiHttpSurface {
    base_url: String,
    username: String,
    password: String,
    http: Client,
}

impl XapiHttpSurface {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http: Client::new(),
        }
    }

    async fn put_xml(&self, document: String) -> Result<()> {
        debug!(document = %document, "putxml");
        let res = self
            .http
            .post(format!("{}/putxml", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "text/xml")
            .body(document)
            .send()
            .await
            .context("codec unreachable")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Codec rejected putxml");
            bail!("codec rejected putxml: {status}: {body}");
        }
        Ok(())
    }

    async fn get_xml(&self, location: &str) -> Result<String> {
        let res = self
            .http
            .get(format!("{}/getxml", self.base_url))
            .query(&[("location", location)])
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .context("codec unreachable")?;

        if !res.status().is_success() {
            bail!("codec rejected getxml {location}: {}", res.status());
        }
        Ok(res.text().await?)
    }

    /// Point the codec's HttpFeedback slots at our webhook: slot 1 carries
    /// UI extension events, slot 2 the standby status feed.
    pub async fn register_feedback(&self, callback_url: &str) -> Result<()> {
        let url = xml_escape(callback_url);
        self.put_xml(command_doc(&format!(
            "<HttpFeedback><Register>\
             <FeedbackSlot>1</FeedbackSlot>\
             <ServerUrl>{url}</ServerUrl>\
             <Format>JSON</Format>\
             <Expression item=\"1\">/Event/UserInterface/Extensions</Expression>\
             </Register></HttpFeedback>"
        )))
        .await?;
        self.put_xml(command_doc(&format!(
            "<HttpFeedback><Register>\
             <FeedbackSlot>2</FeedbackSlot>\
             <ServerUrl>{url}</ServerUrl>\
             <Format>JSON</Format>\
             <Expression item=\"1\">/Status/Standby/State</Expression>\
             </Register></HttpFeedback>"
        )))
        .await?;
        info!(callback_url, "Registered codec feedback slots");
        Ok(())
    }
}

#[async_trait]
impl DeviceSurface for XapiHttpSurface {
    async fn set_hide_all_actions(&self, hidden: bool) -> Result<()> {
        let value = if hidden { "True" } else { "False" };
        self.put_xml(config_doc(&format!(
            "<UserInterface><Features><HideAll>{value}</HideAll></Features></UserInterface>"
        )))
        .await
    }

    async fn set_assistant_enabled(&self, enabled: bool) -> Result<()> {
        let value = if enabled { "On" } else { "Off" };
        self.put_xml(config_doc(&format!(
            "<UserInterface><Assistant><Mode>{value}</Mode></Assistant></UserInterface>"
        )))
        .await
    }

    async fn set_settings_menu_hidden(&self, hidden: bool) -> Result<()> {
        let value = if hidden { "Hidden" } else { "Auto" };
        self.put_xml(config_doc(&format!(
            "<UserInterface><SettingsMenu><Visibility>{value}</Visibility></SettingsMenu></UserInterface>"
        )))
        .await
    }

    async fn set_booking_titles_hidden(&self, hidden: bool) -> Result<()> {
        let value = if hidden { "Hidden" } else { "Auto" };
        self.put_xml(config_doc(&format!(
            "<UserInterface><Bookings><Visibility><Title>{value}</Title></Visibility></Bookings></UserInterface>"
        )))
        .await
    }

    async fn update_panel_name(&self, panel_id: &str, name: &str) -> Result<()> {
        self.put_xml(command_doc(&format!(
            "<UserInterface><Extensions><Panel><Update>\
             <PanelId>{}</PanelId><Name>{}</Name>\
             </Update></Panel></Extensions></UserInterface>",
            xml_escape(panel_id),
            xml_escape(name)
        )))
        .await
    }

    async fn open_panel(&self, panel_id: &str) -> Result<()> {
        self.put_xml(command_doc(&format!(
            "<UserInterface><Extensions><Panel><Open>\
             <PanelId>{}</PanelId>\
             </Open></Panel></Extensions></UserInterface>",
            xml_escape(panel_id)
        )))
        .await
    }

    async fn close_panel(&self) -> Result<()> {
        self.put_xml(command_doc(
            "<UserInterface><Extensions><Panel><Close/></Panel></Extensions></UserInterface>",
        ))
        .await
    }

    async fn set_widget_value(&self, widget_id: &str, value: &str) -> Result<()> {
        self.put_xml(command_doc(&format!(
            "<UserInterface><Extensions><Widget><SetValue>\
             <WidgetId>{}</WidgetId><Value>{}</Value>\
             </SetValue></Widget></Extensions></UserInterface>",
            xml_escape(widget_id),
            xml_escape(value)
        )))
        .await
    }

    async fn show_alert(&self, title: &str, text: &str, duration_secs: u32) -> Result<()> {
        self.put_xml(command_doc(&format!(
            "<UserInterface><Message><Alert><Display>\
             <Title>{}</Title><Text>{}</Text><Duration>{duration_secs}</Duration>\
             </Display></Alert></Message></UserInterface>",
            xml_escape(title),
            xml_escape(text)
        )))
        .await
    }

    async fn display_web_view(&self, url: &str) -> Result<()> {
        self.put_xml(command_doc(&format!(
            "<UserInterface><WebView><Display>\
             <Url>{}</Url><Mode>Modal</Mode>\
             </Display></WebView></UserInterface>",
            xml_escape(url)
        )))
        .await
    }

    async fn contact_address(&self) -> Result<String> {
        let document = self
            .get_xml("/Status/UserInterface/ContactInfo/ContactMethod")
            .await?;
        let number = NUMBER_TAG
            .captures(&document)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());
        match number {
            Some(number) if !number.is_empty() => Ok(number),
            _ => bail!("contact info has no bound number"),
        }
    }
}

fn config_doc(inner: &str) -> String {
    format!("<Configuration>{inner}</Configuration>")
}

fn command_doc(inner: &str) -> String {
    format!("<Command>{inner}</Command>")
}

/// Escape the five XML-significant characters in element content.
fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape(r#"Tom & Jerry's <office>"#),
            "Tom &amp; Jerry&apos;s &lt;office&gt;"
        );
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_config_doc_shape() {
        assert_eq!(
            config_doc("<UserInterface><Features><HideAll>True</HideAll></Features></UserInterface>"),
            "<Configuration><UserInterface><Features><HideAll>True</HideAll></Features></UserInterface></Configuration>"
        );
    }

    #[test]
    fn test_contact_number_extraction() {
        let document = "<Status><UserInterface><ContactInfo>\
                        <ContactMethod item=\"1\"><Number>jdoe@acme.calls.example.net</Number></ContactMethod>\
                        </ContactInfo></UserInterface></Status>";
        let number = NUMBER_TAG
            .captures(document)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
        assert_eq!(number, Some("jdoe@acme.calls.example.net"));
    }
}
