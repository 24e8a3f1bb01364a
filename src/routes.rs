//! Fixed application routes and the default route tables used by the gate.

/// Landing page; default destination after login and for signed-in users
/// hitting public-only pages.
pub const LANDING: &str = "/";
pub const LOGIN: &str = "/auth/login";
pub const LOGIN_REDIRECT: &str = LANDING;
pub const SIGNUP: &str = "/auth/signup";
pub const LOGOUT: &str = "/auth/logout";

/// Query parameter carrying the original path+query through the login page.
pub const FROM_PARAM: &str = "from";

/// Header attached to every gated response with the path originally requested.
pub const CURRENT_PATH_HEADER: &str = "x-current-path";
pub const LOCALE_HEADER: &str = "x-locale";

pub const ANIMAL_DETAIL_PREFIX: &str = "/animals/";
pub const POST_DETAIL_PREFIX: &str = "/posts/";
pub const ARTICLE_DETAIL_PREFIX: &str = "/knowledge/";
pub const ORGANIZATION_DETAIL_PREFIX: &str = "/organizations/";

/// Pages reachable only without a session.
pub const PUBLIC_ONLY_ROUTES: &[&str] = &[
    "/auth/login",
    "/auth/signup",
    "/auth/password-forget",
    "/auth/password-forget/*",
    "/auth/verify-email/*",
];

/// Pages requiring a session.
pub const PROTECTED_ROUTES: &[&str] = &[
    "/bookmarks",
    "/profile",
    "/profile/*",
    "/animals/add",
    "/animals/*/edit",
    "/knowledge/add",
    "/organizations/add",
];

pub fn login_with_from(from: &str) -> String {
    format!("{}?{}={}", LOGIN, FROM_PARAM, urlencoding::encode(from))
}
