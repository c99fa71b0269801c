// Application state for HTTP handlers
use crate::application::user_service::UserService;
use crate::presentation::session::SessionRegistry;

pub struct AppState {
    pub user_service: UserService,
    pub sessions: SessionRegistry,
}
