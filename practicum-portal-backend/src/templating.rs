use handlebars::Handlebars;
use practicum_portal_rules::profile::StudentProfile;
use serde::Serialize;

use crate::error::AppError;

const PARTIALS: [(&str, &str); 3] = [
    ("header", include_str!("../templates/partials/header.hbs")),
    ("footer", include_str!("../templates/partials/footer.hbs")),
    ("notice", include_str!("../templates/partials/notice.hbs")),
];

const TEMPLATES: [(&str, &str); 8] = [
    ("index", include_str!("../templates/index.hbs")),
    ("schools", include_str!("../templates/schools.hbs")),
    ("registered", include_str!("../templates/registered.hbs")),
    ("admin-login", include_str!("../templates/admin-login.hbs")),
    ("admin", include_str!("../templates/admin.hbs")),
    ("confirm", include_str!("../templates/confirm.hbs")),
    ("openid-error", include_str!("../templates/openid-error.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

pub struct Templates {
    handlebars: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, AppError> {
        let mut handlebars = Handlebars::new();
        for (name, source) in PARTIALS {
            handlebars.register_partial(name, source)?;
        }
        for (name, source) in TEMPLATES {
            handlebars.register_template_string(name, source)?;
        }
        Ok(Self { handlebars })
    }

    pub fn render<T: Serialize>(
        &self,
        template_name: &str,
        value: &TemplateWrapper<'_, T>,
    ) -> Result<String, AppError> {
        Ok(self.handlebars.render(template_name, value)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A message shown once at the top of the page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Data every page layout needs, with the page specific data flattened in.
#[derive(Serialize)]
pub struct TemplateWrapper<'a, T> {
    pub csrf_token: &'a str,
    pub title: &'a str,
    pub email: Option<&'a str>,
    pub profile: Option<&'a StudentProfile>,
    pub notice: Option<&'a Notice>,
    #[serde(flatten)]
    pub inner: T,
}

impl<'a, T> TemplateWrapper<'a, T> {
    pub const fn new(csrf_token: &'a str, title: &'a str, inner: T) -> Self {
        Self {
            csrf_token,
            title,
            email: None,
            profile: None,
            notice: None,
            inner,
        }
    }

    #[must_use]
    pub fn email(mut self, email: Option<&'a str>) -> Self {
        self.email = email;
        self
    }

    #[must_use]
    pub fn profile(mut self, profile: Option<&'a StudentProfile>) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub fn notice(mut self, notice: Option<&'a Notice>) -> Self {
        self.notice = notice;
        self
    }
}
