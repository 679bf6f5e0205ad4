//! Symbolic key names.
//!
//! Maps the names a `.kmf` file may use onto HID keyboard-page usage codes.
//! Lookups are case-insensitive and most keys carry a few aliases. Where a
//! name was historically listed twice (`VOLUMEUP`, `MUTE`) the first entry
//! wins.

use alloc::string::String;

/// Resolves a symbolic key name to its HID usage code.
pub fn lookup(name: &str) -> Option<u8> {
    let upper: String = name.to_ascii_uppercase();
    let code = match upper.as_str() {
        "A" => 0x04,
        "B" => 0x05,
        "C" => 0x06,
        "D" => 0x07,
        "E" => 0x08,
        "F" => 0x09,
        "G" => 0x0a,
        "H" => 0x0b,
        "I" => 0x0c,
        "J" => 0x0d,
        "K" => 0x0e,
        "L" => 0x0f,
        "M" => 0x10,
        "N" => 0x11,
        "O" => 0x12,
        "P" => 0x13,
        "Q" => 0x14,
        "R" => 0x15,
        "S" => 0x16,
        "T" => 0x17,
        "U" => 0x18,
        "V" => 0x19,
        "W" => 0x1a,
        "X" => 0x1b,
        "Y" => 0x1c,
        "Z" => 0x1d,

        "1" => 0x1e,
        "2" => 0x1f,
        "3" => 0x20,
        "4" => 0x21,
        "5" => 0x22,
        "6" => 0x23,
        "7" => 0x24,
        "8" => 0x25,
        "9" => 0x26,
        "0" => 0x27,

        "ENTER" => 0x28,
        "ESC" | "ESCAPE" => 0x29,
        "BACKSPACE" => 0x2a,
        "TAB" => 0x2b,
        "SPACE" => 0x2c,
        "MINUS" => 0x2d,
        "EQUAL" | "EQUALS" | "PLUS" => 0x2e,
        "LEFTBRACE" | "LEFTBRACKET" => 0x2f,
        "RIGHTBRACE" | "RIGHTBRACKET" => 0x30,
        "BACKSLASH" => 0x31,
        "HASHTILDE" | "HASHANDTILDE" => 0x32,
        "SEMICOLON" => 0x33,
        "APOSTROPHE" | "QUOTE" => 0x34,
        "GRAVE" | "BACKTICK" | "TILDE" => 0x35,
        "COMMA" => 0x36,
        "DOT" | "PERIOD" => 0x37,
        "SLASH" | "FORWARDSLASH" => 0x38,
        "CAPSLOCK" => 0x39,

        "F1" => 0x3a,
        "F2" => 0x3b,
        "F3" => 0x3c,
        "F4" => 0x3d,
        "F5" => 0x3e,
        "F6" => 0x3f,
        "F7" => 0x40,
        "F8" => 0x41,
        "F9" => 0x42,
        "F10" => 0x43,
        "F11" => 0x44,
        "F12" => 0x45,

        "SYSRQ" => 0x46,
        "SCROLLLOCK" => 0x47,
        "PAUSE" => 0x48,
        "INSERT" => 0x49,
        "HOME" => 0x4a,
        "PAGEUP" => 0x4b,
        "DELETE" => 0x4c,
        "END" => 0x4d,
        "PAGEDOWN" => 0x4e,
        "RIGHT" | "RIGHTARROW" => 0x4f,
        "LEFT" | "LEFTARROW" => 0x50,
        "DOWN" | "DOWNARROW" => 0x51,
        "UP" | "UPARROW" => 0x52,

        "NUMLOCK" => 0x53,
        "KPSLASH" | "NUMPADSLASH" => 0x54,
        "KPASTERISK" | "NUMPADASTERISK" | "NUMPADTIMES" => 0x55,
        "KPMINUS" | "NUMPADMINUS" => 0x56,
        "KPPLUS" | "NUMPADPLUS" => 0x57,
        "KPENTER" | "NUMPADENTER" => 0x58,
        "KP1" | "NUMPAD1" => 0x59,
        "KP2" | "NUMPAD2" => 0x5a,
        "KP3" | "NUMPAD3" => 0x5b,
        "KP4" | "NUMPAD4" => 0x5c,
        "KP5" | "NUMPAD5" => 0x5d,
        "KP6" | "NUMPAD6" => 0x5e,
        "KP7" | "NUMPAD7" => 0x5f,
        "KP8" | "NUMPAD8" => 0x60,
        "KP9" | "NUMPAD9" => 0x61,
        "KP0" | "NUMPAD0" => 0x62,
        "KPDOT" | "NUMPADDOT" => 0x63,

        "102ND" => 0x64,
        "COMPOSE" => 0x65,
        "POWER" => 0x66,
        "KPEQUAL" | "NUMPADEQUAL" | "NUMPADEQUALS" => 0x67,

        "F13" => 0x68,
        "F14" => 0x69,
        "F15" => 0x6a,
        "F16" => 0x6b,
        "F17" => 0x6c,
        "F18" => 0x6d,
        "F19" => 0x6e,
        "F20" => 0x6f,
        "F21" => 0x70,
        "F22" => 0x71,
        "F23" => 0x72,
        "F24" => 0x73,

        "OPEN" => 0x74,
        "HELP" => 0x75,
        "PROPS" => 0x76,
        "FRONT" => 0x77,
        "STOP" => 0x78,
        "AGAIN" => 0x79,
        "UNDO" => 0x7a,
        "CUT" => 0x7b,
        "COPY" => 0x7c,
        "PASTE" => 0x7d,
        "FIND" => 0x7e,
        "MUTE" => 0x7f,
        "VOLUMEUP" => 0x80,
        "VOLUMEDOWN" => 0x81,
        "KPCOMMA" => 0x85,
        "RO" => 0x87,
        "KATAKANAHIRAGANA" => 0x88,
        "YEN" => 0x89,
        "HENKAN" => 0x8a,
        "MUHENKAN" => 0x8b,
        "KPJPCOMMA" => 0x8c,
        "HANGEUL" => 0x90,
        "HANJA" => 0x91,
        "KATAKANA" => 0x92,
        "HIRAGANA" => 0x93,
        "ZENKAKUHANKAKU" => 0x94,
        "KPLEFTPAREN" => 0xb6,
        "KPRIGHTPAREN" => 0xb7,

        "CTRL" | "CONTROL" | "LEFTCTRL" | "LEFTCONTROL" => 0xe0,
        "SHIFT" | "LEFTSHIFT" => 0xe1,
        "ALT" | "LEFTALT" => 0xe2,
        "LEFTMETA" | "WINDOWS" | "GUI" | "LEFTGUI" | "LEFTWINDOWS" => 0xe3,
        "RIGHTCTRL" | "RIGHTCONTROL" => 0xe4,
        "RIGHTSHIFT" => 0xe5,
        "RIGHTALT" => 0xe6,
        "RIGHTMETA" | "RIGHTWINDOWS" | "RIGHTGUI" => 0xe7,

        "MEDIAPLAYPAUSE" => 0xe8,
        "MEDIASTOPCD" => 0xe9,
        "MEDIAPREVIOUSSONG" => 0xea,
        "MEDIANEXTSONG" => 0xeb,
        "MEDIAEJECTCD" => 0xec,
        "MEDIAVOLUMEDOWN" => 0xee,
        "MEDIAMUTE" => 0xef,
        "MEDIAWWW" => 0xf0,
        "MEDIABACK" | "BACK" => 0xf1,
        "MEDIAFORWARD" | "FORWARD" => 0xf2,
        "MEDIASTOP" => 0xf3,
        "MEDIAFIND" => 0xf4,
        "MEDIASCROLLUP" => 0xf5,
        "MEDIASCROLLDOWN" => 0xf6,
        "MEDIAEDIT" => 0xf7,
        "MEDIASLEEP" => 0xf8,
        "MEDIACOFFEE" => 0xf9,
        "MEDIAREFRESH" => 0xfa,
        "MEDIACALC" => 0xfb,

        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_digits() {
        assert_eq!(lookup("A"), Some(0x04));
        assert_eq!(lookup("Z"), Some(0x1d));
        assert_eq!(lookup("1"), Some(0x1e));
        assert_eq!(lookup("0"), Some(0x27));
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(lookup("a"), Some(0x04));
        assert_eq!(lookup("LeftCtrl"), Some(0xe0));
        assert_eq!(lookup("leftctrl"), Some(0xe0));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(lookup("EQUAL"), Some(0x2e));
        assert_eq!(lookup("EQUALS"), Some(0x2e));
        assert_eq!(lookup("PLUS"), Some(0x2e));
        assert_eq!(lookup("ESC"), lookup("ESCAPE"));
        assert_eq!(lookup("KP5"), lookup("NUMPAD5"));
        assert_eq!(lookup("GRAVE"), lookup("BACKTICK"));
    }

    #[test]
    fn test_modifier_range() {
        assert_eq!(lookup("LEFTCTRL"), Some(0xe0));
        assert_eq!(lookup("RIGHTGUI"), Some(0xe7));
    }

    #[test]
    fn test_first_entry_wins_for_duplicates() {
        assert_eq!(lookup("VOLUMEUP"), Some(0x80));
        assert_eq!(lookup("MUTE"), Some(0x7f));
        assert_eq!(lookup("MEDIAMUTE"), Some(0xef));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(lookup("FROBNICATE"), None);
        assert_eq!(lookup(""), None);
    }
}
