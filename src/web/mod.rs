pub mod account;
pub mod clubs;
pub mod error;
pub mod index;
pub mod notice;
pub mod polls;
pub mod proposals;
pub mod roles;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Route resolution will stop at the first match.
    index::configure(conf);
    account::configure(conf);
    clubs::configure(conf);
    polls::configure(conf);
    proposals::configure(conf);
    roles::configure(conf);

    conf.service(actix_files::Files::new("/static", "./static"));
}
