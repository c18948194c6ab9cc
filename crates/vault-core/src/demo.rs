//! Sample vault seeded into a fresh store.

use crate::model::{NewFile, NewVault, VaultId};

pub const VAULT_NAME: &str = "Demo Vault";
pub const FOLDER_ID: &str = "demo-folder-id";
pub const FOLDER_NAME: &str = "Notes";

const WELCOME: &str = "# Welcome to Obsidian Web Vault

This is a web-based Obsidian vault editor that connects to your Google Drive to sync your markdown files.

## Features

- **Real-time editing** with live preview
- **Wikilinks** for connecting notes: [[Another Note]]
- **Google Drive sync** for cloud storage
- **Obsidian-style interface** with dark theme
- **Auto-save** functionality

## Getting Started

1. Connect your Google Drive account
2. Select a folder to use as your vault
3. Start editing your notes!

## Wikilinks

You can link to other notes using double brackets: [[Note Name]]

This creates connections between your notes, just like in Obsidian.";

const ANOTHER_NOTE: &str = "# Another Note

This is another note in your vault.

## Backlinks

This note is linked from [[Welcome]].

## More Content

You can write anything here - thoughts, ideas, documentation, or any other content.

### Code Examples

```javascript
function hello() {
  console.log(\"Hello, World!\");
}
```

### Lists

- Item 1
- Item 2
- Item 3

### Tasks

- [ ] Todo item
- [x] Completed item";

const DAILY_NOTE: &str = "# Daily Note

Today's thoughts and tasks.

## Tasks
- [ ] Review project updates
- [ ] Update documentation
- [ ] Plan next features

## Notes

This is a note inside the Notes folder.

Connected to: [[Welcome]]";

pub fn vault() -> NewVault {
    NewVault {
        name: VAULT_NAME.to_string(),
        folder_id: FOLDER_ID.to_string(),
        is_connected: false,
    }
}

pub fn root_notes(vault_id: VaultId) -> Vec<NewFile> {
    vec![
        NewFile::note(vault_id, "Welcome.md", WELCOME),
        NewFile::note(vault_id, "Another Note.md", ANOTHER_NOTE),
    ]
}

/// Notes that belong inside the [`FOLDER_NAME`] folder.
pub fn folder_notes(vault_id: VaultId) -> Vec<NewFile> {
    vec![NewFile::note(vault_id, "Daily Note.md", DAILY_NOTE)]
}
