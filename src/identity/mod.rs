//! Session issuing and lookup for the gate, the login endpoints and the notification socket.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;

pub use principal::{Principal, Attrs};
pub use session::{Session, SessionToken, SessionManager};
pub use provider::{
    AuthProvider, CookieSessionProvider, LocalAuthProvider, LoginRequest, LoginResponse, SessionInfo,
    SessionProvider,
};

pub const SESSION_COOKIE: &str = "gompet_session";
