#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use lectern_core::AuthCrypto;
use lectern_core::infrastructure::JsonUserDirectory;
use lectern_core::ports::UserDirectory;
use lectern_model::User;
use lectern_server::infra::app_state::AppState;
use lectern_server::infra::config::Config;
use lectern_server::infra::startup::bootstrap_root;

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub directory: Arc<JsonUserDirectory>,
    pub root: User,
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn build_test_app() -> TestApp {
    let mut config = Config::default();
    config.bootstrap.root_password = Some("toor".into());

    let directory = Arc::new(JsonUserDirectory::in_memory());
    let crypto = AuthCrypto::insecure_fast("test-pepper", "test-token-key")
        .expect("test crypto");
    let state = AppState::new(config, directory.clone(), Arc::new(crypto));
    bootstrap_root(&state).await.expect("root bootstrap");

    let root = directory
        .list_all()
        .await
        .expect("list users")
        .into_iter()
        .find(User::is_root)
        .expect("root created");

    let server = TestServer::new(lectern_server::create_app(state.clone()))
        .expect("test server");

    TestApp {
        server,
        state,
        directory,
        root,
    }
}
