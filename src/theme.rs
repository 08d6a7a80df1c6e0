use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    Terminal,
    Mocha,
    Nord,
}

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Theme::Terminal => "Terminal",
            Theme::Mocha => "Mocha",
            Theme::Nord => "Nord",
        }
    }
}

pub const THEME_ORDER: [Theme; 3] = [Theme::Terminal, Theme::Mocha, Theme::Nord];

/// Style set passed explicitly into every render call.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub accent_primary: Color,
    pub accent_secondary: Color,
    pub border_inactive: Color,
    pub selection_bg: Color,
    pub header_fg: Color,
    pub dim_fg: Color,
    pub menu_bg: Color,
    pub btn_bg: Color,
    pub btn_fg: Color,
    pub add_fg: Color,
    pub del_fg: Color,
    pub hunk_fg: Color,
    pub warn_fg: Color,
    pub ok_fg: Color,
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Terminal => Palette {
            bg: Color::Rgb(22, 22, 22),
            fg: Color::Rgb(212, 212, 212),
            accent_primary: Color::Rgb(97, 175, 239),
            accent_secondary: Color::Rgb(229, 192, 123),
            border_inactive: Color::Rgb(68, 68, 68),
            selection_bg: Color::Rgb(55, 55, 55),
            header_fg: Color::Rgb(198, 120, 221),
            dim_fg: Color::Rgb(92, 99, 112),
            menu_bg: Color::Rgb(38, 38, 38),
            btn_bg: Color::Rgb(224, 108, 117),
            btn_fg: Color::Rgb(22, 22, 22),
            add_fg: Color::Rgb(86, 182, 194),
            del_fg: Color::Rgb(224, 108, 117),
            hunk_fg: Color::Rgb(97, 175, 239),
            warn_fg: Color::Rgb(229, 192, 123),
            ok_fg: Color::Rgb(152, 195, 121),
        },
        Theme::Mocha => Palette {
            bg: Color::Rgb(30, 30, 46),
            fg: Color::Rgb(248, 248, 255),
            accent_primary: Color::Rgb(203, 166, 247),
            accent_secondary: Color::Rgb(250, 179, 135),
            border_inactive: Color::Rgb(120, 124, 150),
            selection_bg: Color::Rgb(78, 82, 110),
            header_fg: Color::Rgb(137, 180, 250),
            dim_fg: Color::Rgb(147, 153, 178),
            menu_bg: Color::Rgb(58, 60, 82),
            btn_bg: Color::Rgb(243, 139, 168),
            btn_fg: Color::Rgb(24, 24, 37),
            add_fg: Color::Rgb(148, 226, 213),
            del_fg: Color::Rgb(243, 139, 168),
            hunk_fg: Color::Rgb(203, 166, 247),
            warn_fg: Color::Rgb(250, 179, 135),
            ok_fg: Color::Rgb(166, 227, 161),
        },
        Theme::Nord => Palette {
            bg: Color::Rgb(46, 52, 64),
            fg: Color::Rgb(216, 222, 233),
            accent_primary: Color::Rgb(136, 192, 208),
            accent_secondary: Color::Rgb(235, 203, 139),
            border_inactive: Color::Rgb(76, 86, 106),
            selection_bg: Color::Rgb(67, 76, 94),
            header_fg: Color::Rgb(180, 142, 173),
            dim_fg: Color::Rgb(76, 86, 106),
            menu_bg: Color::Rgb(59, 66, 82),
            btn_bg: Color::Rgb(191, 97, 106),
            btn_fg: Color::Rgb(46, 52, 64),
            add_fg: Color::Rgb(163, 190, 140),
            del_fg: Color::Rgb(191, 97, 106),
            hunk_fg: Color::Rgb(136, 192, 208),
            warn_fg: Color::Rgb(235, 203, 139),
            ok_fg: Color::Rgb(163, 190, 140),
        },
    }
}
