//! Contiguous-run grouping for `pageLevel` classification (§4.5): group
//! same-label runs into sections, merging adjacent runs that share a label
//! across a separating run whose pages all fall below `split_threshold`.

pub struct LabeledPage {
    pub page_id: String,
    pub label: String,
    pub confidence: f32,
}

struct Run {
    label: String,
    page_ids: Vec<String>,
    confidences: Vec<f32>,
}

pub struct GroupedSection {
    pub label: String,
    pub page_ids: Vec<String>,
    pub confidence: f32,
}

pub fn group_page_level(pages: &[LabeledPage], split_threshold: f32) -> Vec<GroupedSection> {
    let mut runs: Vec<Run> = Vec::new();
    for page in pages {
        match runs.last_mut() {
            Some(run) if run.label == page.label => {
                run.page_ids.push(page.page_id.clone());
                run.confidences.push(page.confidence);
            }
            _ => runs.push(Run {
                label: page.label.clone(),
                page_ids: vec![page.page_id.clone()],
                confidences: vec![page.confidence],
            }),
        }
    }

    // Merge a run A, low-confidence filler run B, run C back into one run
    // when A and C share a label. Repeat to a fixed point since merges can
    // cascade (a new A/C pair may appear after a merge).
    loop {
        let mut merged = false;
        let mut i = 0;
        while i + 2 < runs.len() {
            let filler_is_uncertain = runs[i + 1].confidences.iter().all(|c| *c < split_threshold);
            if runs[i].label == runs[i + 2].label && filler_is_uncertain {
                let filler = runs.remove(i + 1);
                let tail = runs.remove(i + 1);
                runs[i].page_ids.extend(filler.page_ids);
                runs[i].confidences.extend(filler.confidences);
                runs[i].page_ids.extend(tail.page_ids);
                runs[i].confidences.extend(tail.confidences);
                merged = true;
            } else {
                i += 1;
            }
        }
        if !merged {
            break;
        }
    }

    runs.into_iter()
        .map(|run| {
            let confidence = run.confidences.iter().cloned().fold(f32::INFINITY, f32::min);
            GroupedSection { label: run.label, page_ids: run.page_ids, confidence }
        })
        .collect()
}
