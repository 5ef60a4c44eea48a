//! Email bodies sent by the relay.
//!
//! Bodies are handlebars templates. HTML templates use `{{x}}`, which escapes
//! every interpolated value, attribute values included. Subjects and text
//! parts are not HTML and use `{{{x}}}` to keep values verbatim.

use handlebars::{Handlebars, RenderError, TemplateError};
use mailer::Email;
use serde::Serialize;

use crate::types::Deployment;

const FAILURE_SUBJECT: &str = "failure-subject";
const FAILURE_HTML: &str = "failure-html";
const FAILURE_TEXT: &str = "failure-text";
const TEST_HTML: &str = "test-html";

pub fn console_url(base_url: &str, region: &str, project_id: &str, site_id: &str) -> String {
    format!(
        "{}/project-{region}-{project_id}/sites/site-{site_id}",
        base_url.trim_end_matches('/')
    )
}

/// `61` -> `1m 1s`, `42` -> `42s`. A full minute stays in seconds.
pub fn format_duration(seconds: u64) -> String {
    if seconds > 60 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

#[derive(Serialize)]
struct FailureContext<'a> {
    site_name: &'a str,
    deployment_id: &'a str,
    created: String,
    status: &'a str,
    duration: String,
    console_url: &'a str,
}

#[derive(Serialize)]
struct TestContext<'a> {
    message: &'a str,
}

/// The registered email templates. Built once and shared by every request.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);

        registry.register_template_string(
            FAILURE_SUBJECT,
            "Failed production deployment on project '{{{site_name}}}'",
        )?;

        registry.register_template_string(
            FAILURE_HTML,
            r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Deployment Failed</title>
  </head>
  <body style="font-family: Arial, sans-serif; background-color: #fff; color: #111; margin: 0; padding: 24px;">
    <div style="max-width: 600px; margin: auto;">
      <p style="font-size: 15px; line-height: 1.5; margin: 0 0 16px 0;">Hi there,</p>
      <p style="font-size: 15px; line-height: 1.5; margin: 0 0 16px 0;">
        There was an error deploying <strong>{{site_name}}</strong> to the production environment
        on <strong>your project</strong>.
      </p>
      <table style="font-size: 14px; margin: 0 0 16px 0; border-collapse: collapse;">
        <tr><td style="padding: 2px 12px 2px 0; color: #666;">Deployment</td><td>{{deployment_id}}</td></tr>
        <tr><td style="padding: 2px 12px 2px 0; color: #666;">Created</td><td>{{created}}</td></tr>
        <tr><td style="padding: 2px 12px 2px 0; color: #666;">Status</td><td>{{status}}</td></tr>
        <tr><td style="padding: 2px 12px 2px 0; color: #666;">Build duration</td><td>{{duration}}</td></tr>
      </table>
      <p style="font-size: 15px; line-height: 1.5; margin: 0 0 24px 0;">
        <a href="{{console_url}}" style="color: #2563eb; text-decoration: none;">See deployment details</a>
      </p>
      <hr style="border: none; border-top: 1px solid #ddd; margin: 24px 0;">
      <p style="font-size: 12px; color: #666; margin: 0; text-align: center;">
        This is an automated notification from Sendra deployment monitoring system.
      </p>
    </div>
  </body>
</html>"#,
        )?;

        registry.register_template_string(
            FAILURE_TEXT,
            "Hi there,\n\n\
             There was an error deploying {{{site_name}}} to the production environment on your project.\n\n\
             Deployment: {{{deployment_id}}}\n\
             Created: {{{created}}}\n\
             Status: {{{status}}}\n\
             Build duration: {{{duration}}}\n\n\
             See deployment details: {{{console_url}}}\n\n\
             This is an automated notification from Sendra deployment monitoring system.\n",
        )?;

        registry.register_template_string(
            TEST_HTML,
            r#"<div style="font-family: Arial, sans-serif; padding: 20px;">
  <h2>Test Email from Sendra</h2>
  <p>{{message}}</p>
  <hr>
  <p style="font-size: 12px; color: #666;">This is a test email sent by the Sendra relay.</p>
</div>"#,
        )?;

        Ok(Templates { registry })
    }

    pub fn failure_email(
        &self,
        deployment: &Deployment,
        to: &str,
        console_url: &str,
    ) -> Result<Email, RenderError> {
        let context = FailureContext {
            site_name: &deployment.site_name,
            deployment_id: &deployment.id,
            created: deployment.created_at.to_rfc2822(),
            status: &deployment.status,
            duration: format_duration(deployment.build_duration),
            console_url,
        };

        Ok(Email {
            to: to.to_string(),
            subject: self.registry.render(FAILURE_SUBJECT, &context)?,
            text: self.registry.render(FAILURE_TEXT, &context)?,
            html: self.registry.render(FAILURE_HTML, &context)?,
        })
    }

    pub fn test_email(
        &self,
        to: String,
        subject: String,
        message: &str,
    ) -> Result<Email, RenderError> {
        let html = self
            .registry
            .render(TEST_HTML, &TestContext { message })?;

        Ok(Email {
            to,
            subject,
            text: message.to_string(),
            html,
        })
    }
}
