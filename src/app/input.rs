// Download-form input editing.
// - Tab/Shift+Tab traversal across the form fields.
// - Cursor movement and character insert/delete in the URL and folder fields.
// - Left/Right cycling for the mode, quality, format, and bitrate selectors.
use crate::{
    catalog::{Catalog, load_catalog},
    media::{AudioBitrate, AudioFormat},
    model::InputField,
    progress::DownloadMode,
};

use super::App;

impl App {
    pub fn next_input(&mut self) {
        self.focus_input(self.active_input.next());
    }

    pub fn previous_input(&mut self) {
        self.focus_input(self.active_input.previous());
    }

    pub fn move_cursor_left(&mut self) {
        match self.active_input {
            InputField::Url => self.url_cursor = self.url_cursor.saturating_sub(1),
            InputField::Destination => {
                self.destination_cursor = self.destination_cursor.saturating_sub(1)
            }
            InputField::Mode => self.toggle_mode(),
            InputField::Quality => self.cycle_quality(false),
            InputField::AudioFormat => self.cycle_audio_format(false),
            InputField::Bitrate => self.cycle_bitrate(false),
        }
    }

    pub fn move_cursor_right(&mut self) {
        match self.active_input {
            InputField::Url => {
                let max = self.url.chars().count();
                self.url_cursor = (self.url_cursor + 1).min(max);
            }
            InputField::Destination => {
                let max = self.destination.chars().count();
                self.destination_cursor = (self.destination_cursor + 1).min(max);
            }
            InputField::Mode => self.toggle_mode(),
            InputField::Quality => self.cycle_quality(true),
            InputField::AudioFormat => self.cycle_audio_format(true),
            InputField::Bitrate => self.cycle_bitrate(true),
        }
    }

    pub fn move_cursor_home(&mut self) {
        match self.active_input {
            InputField::Url => self.url_cursor = 0,
            InputField::Destination => self.destination_cursor = 0,
            _ => {}
        }
    }

    pub fn move_cursor_end(&mut self) {
        match self.active_input {
            InputField::Url => self.url_cursor = self.url.chars().count(),
            InputField::Destination => {
                self.destination_cursor = self.destination.chars().count()
            }
            _ => {}
        }
    }

    pub fn push_active_input_char(&mut self, ch: char) {
        match self.active_input {
            InputField::Url => insert_char(&mut self.url, &mut self.url_cursor, ch),
            InputField::Destination => {
                insert_char(&mut self.destination, &mut self.destination_cursor, ch)
            }
            InputField::Mode => {
                if ch == ' ' {
                    self.toggle_mode();
                }
            }
            InputField::Quality | InputField::AudioFormat | InputField::Bitrate => {
                if ch == ' ' {
                    self.move_cursor_right();
                }
            }
        }
    }

    pub fn backspace_active_input(&mut self) {
        match self.active_input {
            InputField::Url => remove_char_before(&mut self.url, &mut self.url_cursor),
            InputField::Destination => {
                remove_char_before(&mut self.destination, &mut self.destination_cursor)
            }
            _ => {}
        }
    }

    pub fn clear_active_input(&mut self) {
        match self.active_input {
            InputField::Url => {
                self.url.clear();
                self.url_cursor = 0;
            }
            InputField::Destination => {
                self.destination.clear();
                self.destination_cursor = 0;
            }
            _ => {}
        }
    }

    /// Switching back to video mode rebuilds the quality list from the
    /// loaded video, so any earlier choice no longer applies.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.rebuild_catalog();
        log::debug!("mode switched to {}", self.mode.label());
    }

    pub(super) fn rebuild_catalog(&mut self) {
        match (&self.handle, self.mode) {
            (Some(handle), DownloadMode::Combined) => {
                self.catalog = load_catalog(handle, self.mode);
                self.selection = self.catalog.select(1).ok();
            }
            _ => {
                self.catalog = Catalog::empty();
                self.selection = None;
            }
        }
    }

    fn focus_input(&mut self, field: InputField) {
        self.active_input = field;
        match field {
            InputField::Url => self.url_cursor = self.url.chars().count(),
            InputField::Destination => {
                self.destination_cursor = self.destination.chars().count()
            }
            _ => {}
        }
    }

    fn cycle_quality(&mut self, forward: bool) {
        let count = self.catalog.len();
        if count == 0 {
            return;
        }

        let current = self.selection.map(|selection| selection.index()).unwrap_or(1);
        let next = if forward {
            current % count + 1
        } else if current <= 1 {
            count
        } else {
            current - 1
        };
        self.selection = self.catalog.select(next).ok();
    }

    fn cycle_audio_format(&mut self, forward: bool) {
        self.audio_format = cycle(&AudioFormat::CHOICES, &self.audio_format, forward);
    }

    fn cycle_bitrate(&mut self, forward: bool) {
        self.bitrate = cycle(&AudioBitrate::ALL, &self.bitrate, forward);
    }
}

fn cycle<T: Copy + PartialEq>(choices: &[T], current: &T, forward: bool) -> T {
    let index = choices
        .iter()
        .position(|choice| choice == current)
        .unwrap_or(0);
    let next = if forward {
        (index + 1) % choices.len()
    } else if index == 0 {
        choices.len() - 1
    } else {
        index - 1
    };
    choices[next]
}

fn insert_char(value: &mut String, cursor: &mut usize, ch: char) {
    if ch.is_control() {
        return;
    }
    let byte_index = byte_index_for_char(value, *cursor);
    value.insert(byte_index, ch);
    *cursor += 1;
}

fn remove_char_before(value: &mut String, cursor: &mut usize) {
    if *cursor == 0 {
        return;
    }

    let remove_char_index = *cursor - 1;
    let start = byte_index_for_char(value, remove_char_index);
    let end = byte_index_for_char(value, remove_char_index + 1);
    value.replace_range(start..end, "");
    *cursor -= 1;
}

pub(super) fn byte_index_for_char(input: &str, char_index: usize) -> usize {
    if char_index == 0 {
        return 0;
    }

    input
        .char_indices()
        .nth(char_index)
        .map(|(index, _)| index)
        .unwrap_or(input.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_index_handles_multibyte_chars() {
        assert_eq!(byte_index_for_char("día", 0), 0);
        assert_eq!(byte_index_for_char("día", 2), 3);
        assert_eq!(byte_index_for_char("día", 9), 4);
    }

    #[test]
    fn insert_and_remove_respect_cursor() {
        let mut value = "htps".to_string();
        let mut cursor = 2;
        insert_char(&mut value, &mut cursor, 't');
        assert_eq!((value.as_str(), cursor), ("https", 3));

        remove_char_before(&mut value, &mut cursor);
        assert_eq!((value.as_str(), cursor), ("htps", 2));

        let mut cursor = 0;
        remove_char_before(&mut value, &mut cursor);
        assert_eq!(value, "htps");

        insert_char(&mut value, &mut cursor, '\t');
        assert_eq!(value, "htps");
    }

    #[test]
    fn selectors_wrap_around() {
        assert_eq!(cycle(&AudioFormat::CHOICES, &None, false), Some(AudioFormat::Wav));
        assert_eq!(cycle(&AudioFormat::CHOICES, &Some(AudioFormat::Wav), true), None);
        assert_eq!(cycle(&AudioBitrate::ALL, &AudioBitrate::Default, true), AudioBitrate::K64);
    }
}
