#![cfg(test)]

use std::fs;

use tempfile::TempDir;

pub const POST_HELLO_IT: &str = "---
title: Hello
date: 2024-01-01
category: Fisco
excerpt: Primo articolo
author: Mario Rossi
---
Ciao mondo.

Questo è il corpo dell'articolo.
";

pub const POST_HELLO_EN: &str = "---
title: Hi
date: 2024-01-02
excerpt: First article
---
Hello world.
";

pub const POST_PROMO_IT: &str = "---
title: Promo
date: 2024-04-10
---
Offerta.
";

pub const POST_PROMO_EN: &str = "---
title: Special promo
date: 2024-04-11
slug: special-promo
---
Offer.
";

pub const POST_MISSING_DATE: &str = "---
title: No date here
---
Body.
";

pub const POST_BROKEN_YAML: &str = "---
title: [unclosed
date: 2024-01-01
---
Body.
";

pub const LEAD_MAGNET_POST: &str = "---
title: Aprire un'attività in Italia
date: 2024-02-15
lead_magnet:
  title: Guida completa
  description: Scarica il PDF
  type: italian-business-guide
---
Contenuto.
";

pub fn post(title: &str, date: &str) -> String {
    format!("---\ntitle: {}\ndate: {}\n---\nBody of {}.\n", title, date, title)
}

/// Creates a temporary content directory holding the given files.
pub fn content_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}
