use crate::application::{error::HttpError, operations::WorkloadConfig};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Values shown next to each demo panel on the landing page.
#[derive(Debug, Clone)]
pub struct IndexView {
    pub operation_ttl_seconds: u32,
    pub operation_delay_seconds: String,
    pub user_ttl_seconds: u32,
    pub user_delay_seconds: String,
}

impl From<&WorkloadConfig> for IndexView {
    fn from(config: &WorkloadConfig) -> Self {
        Self {
            operation_ttl_seconds: config.operation_ttl_seconds,
            operation_delay_seconds: format_seconds(config.operation_delay.as_millis()),
            user_ttl_seconds: config.user_ttl_seconds,
            user_delay_seconds: format_seconds(config.user_delay.as_millis()),
        }
    }
}

fn format_seconds(millis: u128) -> String {
    if millis % 1000 == 0 {
        format!("{}", millis / 1000)
    } else {
        format!("{}.{:03}", millis / 1000, millis % 1000)
            .trim_end_matches('0')
            .to_string()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: IndexView,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn whole_seconds_render_without_fraction() {
        assert_eq!(format_seconds(3000), "3");
        assert_eq!(format_seconds(1500), "1.5");
        assert_eq!(format_seconds(50), "0.05");
    }

    #[test]
    fn index_mentions_configured_timings() {
        let config = WorkloadConfig {
            operation_delay: Duration::from_millis(1500),
            ..Default::default()
        };
        let html = IndexTemplate {
            view: IndexView::from(&config),
        }
        .render()
        .expect("template renders");

        assert!(html.contains("/static/js/app.js"));
        assert!(html.contains("1.5"));
        assert!(html.contains("45"));
    }
}
