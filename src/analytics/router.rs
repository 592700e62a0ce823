use super::project::Project;

/// A navigation key. `Main` is the overview, `Generation` the FLOW-only image statistics,
/// everything else a distribution channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Channel {
    #[default]
    Main,
    Telegram,
    Site,
    Zen,
    Vk,
    VcRu,
    Generation,
    Other(String),
}

/// Order of the navigation bar.
pub const NAV_CHANNELS: [Channel; 7] = [
    Channel::Main,
    Channel::Telegram,
    Channel::Site,
    Channel::Zen,
    Channel::Vk,
    Channel::VcRu,
    Channel::Generation,
];

impl Channel {
    pub fn from_key(key: &str) -> Self {
        match key {
            "" => Channel::Main,
            "telegram" => Channel::Telegram,
            "site" => Channel::Site,
            "zen" => Channel::Zen,
            "vk" => Channel::Vk,
            "vc_ru" => Channel::VcRu,
            "generation" => Channel::Generation,
            other => Channel::Other(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Channel::Main => "",
            Channel::Telegram => "telegram",
            Channel::Site => "site",
            Channel::Zen => "zen",
            Channel::Vk => "vk",
            Channel::VcRu => "vc_ru",
            Channel::Generation => "generation",
            Channel::Other(key) => key,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Channel::Main => "Главная",
            Channel::Telegram => "Телеграм канал",
            Channel::Site => "Сайт",
            Channel::Zen => "Дзен",
            Channel::Vk => "VK",
            Channel::VcRu => "VC.ru",
            Channel::Generation => "Generation",
            Channel::Other(key) => key,
        }
    }
}

/// Which page becomes visible and which loader runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Main,
    Channel(Channel),
    Generation,
}

impl Route {
    pub fn page_id(&self) -> &'static str {
        match self {
            Route::Main => "page-main",
            Route::Channel(_) => "page-channel",
            Route::Generation => "page-generation",
        }
    }
}

pub const PAGE_IDS: [&str; 3] = ["page-main", "page-channel", "page-generation"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub channel: Channel,
    pub active: bool,
    pub hidden: bool,
}

/// Current project and channel. Pure state; the dashboard applies its decisions.
#[derive(Debug, Clone, Default)]
pub struct ViewRouter {
    project: Project,
    channel: Channel,
}

impl ViewRouter {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            channel: Channel::Main,
        }
    }

    pub fn project(&self) -> Project {
        self.project
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Selects a navigation key. The generation view falls back to the overview for projects
    /// that do not have it.
    pub fn select(&mut self, channel: Channel) -> Route {
        self.channel = match channel {
            Channel::Generation if !self.project.has_generation() => Channel::Main,
            other => other,
        };
        self.route()
    }

    /// Changes the project and keeps the current channel where the new project has it.
    pub fn switch_project(&mut self, project: Project) -> Route {
        self.project = project;
        let channel = self.channel.clone();
        self.select(channel)
    }

    pub fn route(&self) -> Route {
        match &self.channel {
            Channel::Main => Route::Main,
            Channel::Generation => Route::Generation,
            other => Route::Channel(other.clone()),
        }
    }

    pub fn nav_items(&self) -> Vec<NavItem> {
        NAV_CHANNELS
            .iter()
            .map(|ch| NavItem {
                channel: ch.clone(),
                active: *ch == self.channel,
                hidden: *ch == Channel::Generation && !self.project.has_generation(),
            })
            .collect()
    }
}
