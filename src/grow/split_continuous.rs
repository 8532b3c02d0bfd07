//! Best-threshold search on a numeric predictor.

use super::{class_split_loss, Grower, EPS, NA_LEVEL};
use crate::errors::TreeError;
use crate::labels::continuous_labels;
use crate::sort::shell_sort;

impl Grower<'_> {
    /// Scans the midpoints between consecutive distinct values of predictor
    /// `iv` at node `inode`. Members with a missing value contribute their
    /// node-deviance term to every candidate and are attributed to neither
    /// side. On improvement over `bval` and `devtarget`, stages the split on
    /// the node and rewrites the routing signals.
    pub(super) fn split_continuous(
        &mut self,
        inode: usize,
        iv: usize,
        devtarget: f64,
        bval: &mut f64,
    ) -> Result<(), TreeError> {
        let data = self.data;
        let nc = data.n_classes();
        let nobs = data.n_obs();
        let target = inode as i32;
        log::trace!("trying continuous split on predictor {}", iv);

        let mut ns = 0usize;
        let mut sdev = 0.0;
        let mut totw = 0.0;
        for j in 0..nobs {
            if self.where_pos[j] != target {
                continue;
            }
            let xv = data.x(j, iv);
            let w = data.weight(j);
            if !xv.is_nan() {
                if nc > 0 {
                    self.scratch.classes[ns] = data.class_index(j);
                } else {
                    self.scratch.responses[ns] = data.y(j);
                }
                self.scratch.ws[ns] = w;
                self.scratch.xs[ns] = xv;
                ns += 1;
                totw += w;
            } else if nc > 0 {
                if w > 0.0 {
                    sdev -= 2.0 * w * self.nodes.yprob(inode)[data.class_index(j)].ln();
                }
            } else {
                let d = data.y(j) - self.nodes.yval(inode);
                sdev += w * d * d;
            }
        }
        if self.gini && sdev > 0.0 {
            return Err(TreeError::GiniWithMissing);
        }
        if ns < 2 || totw < EPS {
            return Ok(());
        }

        let gini = self.gini;
        let min_cut = self.min_cut;
        let scratch = &mut self.scratch;
        let mut ysum = 0.0;
        let mut ytot = 0.0;
        let mut y2 = 0.0;
        if nc > 0 {
            shell_sort(
                &mut scratch.xs[..ns],
                &mut scratch.classes[..ns],
                &mut scratch.ws[..ns],
            );
            for t in scratch.tab[..2 * nc].iter_mut() {
                *t = 0.0;
            }
        } else {
            shell_sort(
                &mut scratch.xs[..ns],
                &mut scratch.responses[..ns],
                &mut scratch.ws[..ns],
            );
            for j in 0..ns {
                ytot += scratch.ws[j] * scratch.responses[j];
                y2 += scratch.ws[j] * scratch.responses[j] * scratch.responses[j];
            }
        }

        // candidate positions are bounded by observation counts: at least
        // min_cut observations on each side
        let mc = (min_cut.ceil() as usize).max(1);
        if ns < 2 * mc {
            return Ok(());
        }
        let lo = mc - 1;
        let hi = ns - mc;
        let mut js = lo;
        let first = scratch.xs[js];
        if scratch.xs[ns - 1] == first {
            return Ok(()); // no distinct values past the lower bound
        }
        while scratch.xs[js + 1] == first {
            js += 1;
        }
        if js >= hi {
            return Ok(());
        }
        let mut split = 0.5 * (first + scratch.xs[js + 1]);
        let mut cntl = 0.0;
        for j in 0..ns {
            if scratch.xs[j] < split {
                cntl += scratch.ws[j];
                if nc > 0 {
                    scratch.tab[scratch.classes[j]] += scratch.ws[j];
                } else {
                    ysum += scratch.ws[j] * scratch.responses[j];
                }
            } else if nc > 0 {
                scratch.tab[scratch.classes[j] + nc] += scratch.ws[j];
            }
        }
        let mut ldev = if nc > 0 {
            class_split_loss(
                gini,
                &scratch.tab[..nc],
                &scratch.tab[nc..2 * nc],
                cntl,
                totw - cntl,
                totw,
            )
        } else {
            y2 - ysum * ysum / cntl - (ytot - ysum) * (ytot - ysum) / (totw - cntl)
        };
        let mut bdev = ldev;
        let mut bsplit = split;
        while js < hi - 1 {
            js += 1;
            let tmp = scratch.xs[js];
            if scratch.xs[ns - 1] == tmp {
                break;
            }
            cntl += scratch.ws[js];
            if nc > 0 {
                scratch.tab[scratch.classes[js]] += scratch.ws[js];
                scratch.tab[scratch.classes[js] + nc] -= scratch.ws[js];
            } else {
                ysum += scratch.ws[js] * scratch.responses[js];
            }
            while scratch.xs[js + 1] == tmp {
                js += 1;
                cntl += scratch.ws[js];
                if nc > 0 {
                    scratch.tab[scratch.classes[js]] += scratch.ws[js];
                    scratch.tab[scratch.classes[js] + nc] -= scratch.ws[js];
                } else {
                    ysum += scratch.ws[js] * scratch.responses[js];
                }
            }
            if js >= hi {
                break;
            }
            split = 0.5 * (tmp + scratch.xs[js + 1]);
            ldev = if nc > 0 {
                class_split_loss(
                    gini,
                    &scratch.tab[..nc],
                    &scratch.tab[nc..2 * nc],
                    cntl,
                    totw - cntl,
                    totw,
                )
            } else {
                y2 - ysum * ysum / cntl - (ytot - ysum) * (ytot - ysum) / (totw - cntl)
            };
            if ldev < bdev {
                bdev = ldev;
                bsplit = split;
            }
        }

        let best = bdev + sdev;
        log::trace!("predictor {} best value {} at {}", iv, best, bsplit);
        if best >= *bval || best >= devtarget {
            return Ok(());
        }
        *bval = best;
        self.nodes.set_var(inode, iv + 1);
        let (labl, labr) = continuous_labels(bsplit);
        self.nodes.set_labels(inode, labl, labr);
        for j in 0..nobs {
            self.scratch.routing[j] = if self.where_pos[j] == target {
                let xv = data.x(j, iv);
                if xv.is_nan() {
                    NA_LEVEL
                } else {
                    (xv > bsplit) as i32
                }
            } else {
                -1
            };
        }
        Ok(())
    }
}
