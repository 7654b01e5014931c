mod cache;
mod session;

pub use cache::{load_session, SessionError, SessionStore};
pub use session::SsoSession;
