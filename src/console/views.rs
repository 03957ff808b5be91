//! HTML rendering for console pages.

use minijinja::{Environment, context};
use serde::Serialize;

use super::state::{DashboardState, LoginFormState, VendorFormState};

const TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("templates/base.html")),
    ("loading.html", include_str!("templates/loading.html")),
    ("login.html", include_str!("templates/login.html")),
    ("dashboard.html", include_str!("templates/dashboard.html")),
    ("vendor_form.html", include_str!("templates/vendor_form.html")),
];

/// Compiled page templates
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn loading(&self) -> Result<String, minijinja::Error> {
        self.render("loading.html", context! {})
    }

    pub fn login(&self, state: &LoginFormState) -> Result<String, minijinja::Error> {
        self.render("login.html", state)
    }

    pub fn dashboard(&self, state: &DashboardState) -> Result<String, minijinja::Error> {
        self.render("dashboard.html", state)
    }

    pub fn vendor_form(&self, state: &VendorFormState) -> Result<String, minijinja::Error> {
        self.render("vendor_form.html", state)
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}
