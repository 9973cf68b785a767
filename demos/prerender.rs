use trillium_prerender::Prerender;
use trillium_smol::ClientConfig;

pub fn main() {
    env_logger::init();
    trillium_smol::run((
        Prerender::new(ClientConfig::default(), "http://localhost:3000/render/")
            .with_extra_bot_user_agents(["googlebot", "bingpreview"]),
        |conn: trillium::Conn| async move {
            conn.ok("<html><body>rendered client-side in a real app</body></html>")
        },
    ));
}
