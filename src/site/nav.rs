use itertools::Itertools;

/// Pages linked from the shared header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitePage {
    Home,
    About,
    Blog,
    Sitemap,
}

impl SitePage {
    pub const NAV: [SitePage; 4] = [
        SitePage::Home,
        SitePage::About,
        SitePage::Blog,
        SitePage::Sitemap,
    ];

    /// Location below the site base path.
    pub fn site_path(&self) -> &'static str {
        match self {
            SitePage::Home => "index.html",
            SitePage::About => "achievements/index.html",
            SitePage::Blog => "blog/index.html",
            SitePage::Sitemap => "sitemap.html",
        }
    }

    pub fn absolute_path(&self, base_path: &str) -> String {
        format!("{}{}", base_path, self.site_path())
    }

    /// Used when the page's own `<title>` cannot be fetched.
    pub fn fallback_label(&self) -> &'static str {
        match self {
            SitePage::Home => "ちこいアーカイブ",
            SitePage::About => "自己紹介",
            SitePage::Blog => "ブログ",
            SitePage::Sitemap => "サイトマップ",
        }
    }
}

pub const GAME_TITLES: &[(&str, &str)] = &[
    ("th6", "東方紅魔郷"),
    ("th7", "東方妖々夢"),
    ("th8", "東方永夜抄"),
    ("th10", "東方風神録"),
    ("th11", "東方地霊殿"),
    ("th12", "東方星蓮船"),
    ("th13", "東方神霊廟"),
    ("th14", "東方輝針城"),
    ("th15", "東方紺珠伝"),
    ("th16", "東方天空璋"),
    ("th17", "東方鬼形獣"),
    ("th18", "東方虹龍洞"),
    ("th20", "東方錦上京"),
    ("th128", "妖精大戦争"),
    ("alco", "黄昏酒場"),
    ("tmgc", "トルテルマジック"),
];

/// Pages nested one level inside a game directory: (game, directory, title).
pub const GAME_SUBPAGES: &[(&str, &str, &str)] = &[("tmgc", "setup", "セットアップガイド")];

const UNKNOWN_GAME_TITLE: &str = "ゲーム";

pub fn is_game_key(segment: &str) -> bool {
    match segment {
        "alco" | "tmgc" => true,
        _ => segment
            .strip_prefix("th")
            .map_or(false, |digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())),
    }
}

pub fn game_title(key: &str) -> &'static str {
    GAME_TITLES
        .iter()
        .find(|(game, _)| *game == key)
        .map_or(UNKNOWN_GAME_TITLE, |(_, title)| *title)
}

/// First directory of `pathname` naming a game (`th6`, `th128`, `alco`, ...).
pub fn game_segment(pathname: &str) -> Option<&str> {
    let directories = match pathname.rfind('/') {
        Some(end) => &pathname[..end],
        None => return None,
    };
    directories.split('/').find(|segment| is_game_key(segment))
}

fn directory_segments(path: &str) -> Vec<&str> {
    let end = path.rfind('/').unwrap_or(0);
    path[..end].split('/').filter(|s| !s.is_empty()).collect()
}

/// Relative href leading from the document at `from` to the absolute path `to`.
pub fn relativize(from: &str, to: &str) -> String {
    let from_dirs = directory_segments(from);
    let to_dirs = directory_segments(to);
    let file = to.rsplit('/').next().unwrap_or_default();

    let common = from_dirs
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = std::iter::repeat("..").take(from_dirs.len() - common);
    let downs = to_dirs[common..].iter().copied();
    let path = ups.chain(downs).chain(std::iter::once(file)).join("/");
    if path.is_empty() {
        "./".to_string()
    } else {
        path
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Crumb {
    pub label: String,
    pub href: Option<String>,
}

impl Crumb {
    fn link(label: &str, href: String) -> Crumb {
        Crumb {
            label: label.to_string(),
            href: Some(href),
        }
    }

    fn current(label: &str) -> Crumb {
        Crumb {
            label: label.to_string(),
            href: None,
        }
    }
}

/// Navigation facts derived from the current location.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    pub is_home: bool,
    pub links: Vec<(SitePage, String)>,
    pub stylesheet: String,
    pub breadcrumb: Option<Vec<Crumb>>,
}

impl PageContext {
    pub fn link(&self, page: SitePage) -> Option<&str> {
        self.links
            .iter()
            .find(|(target, _)| *target == page)
            .map(|(_, href)| href.as_str())
    }
}

fn site_relative<'a>(pathname: &'a str, base_path: &str) -> &'a str {
    pathname
        .strip_prefix(base_path)
        .unwrap_or_else(|| pathname.trim_start_matches('/'))
}

fn breadcrumb(pathname: &str, base_path: &str, segments: &[&str]) -> Option<Vec<Crumb>> {
    let game = match segments {
        ["blog", game, _, ..] if is_game_key(game) => *game,
        _ => return None,
    };
    let href = |path: String| relativize(pathname, &path);

    let mut crumbs = vec![
        Crumb::link("ホーム", href(SitePage::Home.absolute_path(base_path))),
        Crumb::link("ブログ", href(SitePage::Blog.absolute_path(base_path))),
    ];
    let subpage = segments.get(2).filter(|_| segments.len() > 3).and_then(|dir| {
        GAME_SUBPAGES
            .iter()
            .find(|(g, d, _)| *g == game && d == dir)
            .map(|(_, _, title)| *title)
    });
    match subpage {
        Some(title) => {
            let game_index = format!("{}blog/{}/index.html", base_path, game);
            crumbs.push(Crumb::link(game_title(game), href(game_index)));
            crumbs.push(Crumb::current(title));
        }
        None => crumbs.push(Crumb::current(game_title(game))),
    }
    Some(crumbs)
}

pub fn page_context(pathname: &str, base_path: &str) -> PageContext {
    let relative = site_relative(pathname, base_path);
    let segments: Vec<&str> = relative.split('/').collect();

    let is_home = relative.is_empty() || relative == "index.html";
    let stylesheet = match segments.as_slice() {
        ["blog", game, _] if is_game_key(game) => format!("{}blog/style.css", base_path),
        _ => format!("{}style.css", base_path),
    };
    let links = SitePage::NAV
        .iter()
        .map(|page| (*page, relativize(pathname, &page.absolute_path(base_path))))
        .collect();

    PageContext {
        is_home,
        links,
        stylesheet: relativize(pathname, &stylesheet),
        breadcrumb: breadcrumb(pathname, base_path, &segments),
    }
}
