// Scraped web UI pages and the forms found on them.
//
// Pages are kept as raw text and parsed on demand; `scraper::Html` is not
// `Send`, so it never outlives the call that built it.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Error;

static FORM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("valid form selector"));
static FIELD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input[name], select[name], textarea[name]").expect("valid field selector")
});
static OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("valid option selector"));
static PASSWORD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[type="password"]"#).expect("valid password selector")
});

/// Web UI pages with a fixed location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapedResource {
    /// Cloud distribution point settings, reached through the legacy
    /// package page.
    JcdsConfiguration,
}

impl ScrapedResource {
    /// Path under the endpoint, query included.
    pub fn path(self) -> &'static str {
        match self {
            Self::JcdsConfiguration => "legacy/packages.html?id=-1&o=c",
        }
    }
}

/// A page fetched from the web UI.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    url: Url,
    status: u16,
    body: String,
}

impl ScrapedPage {
    pub fn new(url: Url, status: u16, body: String) -> Self {
        Self { url, status, body }
    }

    /// Final URL, after any redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// The first form matching `selector` (e.g. `"form#packageForm"`).
    pub fn form(&self, selector: &str) -> Result<Option<Form>, Error> {
        let selector = Selector::parse(selector).map_err(|e| Error::InvalidSelector {
            selector: selector.to_owned(),
            message: e.to_string(),
        })?;
        let document = Html::parse_document(&self.body);
        Ok(document.select(&selector).next().map(Form::from_element))
    }

    /// Every form on the page, in document order.
    pub fn forms(&self) -> Vec<Form> {
        let document = Html::parse_document(&self.body);
        document.select(&FORM).map(Form::from_element).collect()
    }

    /// Whether the page is the sign-in screen: a form with a password
    /// field. The server answers a rejected login with this page and a 200.
    pub fn has_login_form(&self) -> bool {
        let document = Html::parse_document(&self.body);
        document
            .select(&FORM)
            .any(|form| form.select(&PASSWORD).next().is_some())
    }
}

/// A form and the values it would submit as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pub action: Option<String>,
    /// Upper-cased; `GET` when the page doesn't say.
    pub method: String,
    pub fields: Vec<(String, String)>,
}

impl Form {
    fn from_element(form: ElementRef<'_>) -> Self {
        let action = form
            .value()
            .attr("action")
            .filter(|a| !a.is_empty())
            .map(str::to_owned);
        let method = form.value().attr("method").unwrap_or("get").to_uppercase();

        let fields = form
            .select(&FIELD)
            .filter_map(|field| {
                let name = field.value().attr("name")?;
                field_value(field).map(|value| (name.to_owned(), value))
            })
            .collect();

        Self {
            action,
            method,
            fields,
        }
    }

    /// Value of the first field called `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value of `name`, adding the field when absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }
}

/// What a browser would submit for one field, or `None` when it submits
/// nothing (buttons, unchecked boxes, file pickers).
fn field_value(field: ElementRef<'_>) -> Option<String> {
    let el = field.value();
    match el.name() {
        "textarea" => Some(field.text().collect()),
        "select" => {
            let options: Vec<ElementRef<'_>> = field.select(&OPTION).collect();
            let chosen = options
                .iter()
                .find(|o| o.value().attr("selected").is_some())
                .or_else(|| options.first())?;
            let value = match chosen.value().attr("value") {
                Some(value) => value.to_owned(),
                None => chosen.text().collect::<String>().trim().to_owned(),
            };
            Some(value)
        }
        _ => {
            let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
            match kind.as_str() {
                "submit" | "button" | "reset" | "image" | "file" => None,
                "checkbox" | "radio" => el
                    .attr("checked")
                    .map(|_| el.attr("value").unwrap_or("on").to_owned()),
                _ => Some(el.attr("value").unwrap_or_default().to_owned()),
            }
        }
    }
}
