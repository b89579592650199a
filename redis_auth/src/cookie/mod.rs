mod directive;
mod encoding;
mod policy;

pub use directive::CookieDirective;
pub use policy::CookiePolicy;
