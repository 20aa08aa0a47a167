mod app;
mod overlay;

use app::App;

fn main() -> iced::Result {
    env_logger::init();

    iced::application(App::new, App::update, App::view)
        .title("Framewatch")
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(800.0, 680.0),
            exit_on_close_request: false,
            ..Default::default()
        })
        .run()
}
