use kiosk::ShellConfig;
use kiosk::config::UpdateConfig;

fn main() {
    let config = ShellConfig {
        app_name: "Soulbound".to_string(),
        title: "Soulbound".to_string(),
        content_url: "https://play.soulbound.game/".to_string(),
        update: UpdateConfig {
            enabled: true,
            owner: "Fynn9563".to_string(),
            repo: "Soulbound-Wrapper".to_string(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        ..ShellConfig::default()
    };

    if let Err(err) = kiosk::run(config) {
        eprintln!("soulbound failed to start: {}", err);
        std::process::exit(1);
    }
}
