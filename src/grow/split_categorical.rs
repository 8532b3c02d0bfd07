//! Best bipartition of a categorical predictor's levels.

use super::{xlogx, Grower, NA_LEVEL};
use crate::errors::TreeError;
use crate::labels::LEVEL_ALPHABET;
use crate::sort::shell_sort;

impl Grower<'_> {
    /// Searches the bipartitions of the levels present at node `inode`.
    /// Two present levels admit a single split; two-class, regression and
    /// ordered predictors use the sorted-score shortcut; everything else is
    /// enumerated exhaustively over left-set masks with bit 0 forced.
    pub(super) fn split_categorical(
        &mut self,
        inode: usize,
        iv: usize,
        devtarget: f64,
        bval: &mut f64,
    ) -> Result<(), TreeError> {
        let data = self.data;
        let nc = data.n_classes();
        let nobs = data.n_obs();
        let nl = data.levels()[iv];
        let target = inode as i32;
        log::trace!("trying categorical split on predictor {}", iv);

        for s in self.scratch.seen[..nl].iter_mut() {
            *s = false;
        }
        let mut sdev = 0.0;
        for j in 0..nobs {
            if self.where_pos[j] != target {
                self.scratch.member_level[j] = -1;
                continue;
            }
            let xv = data.x(j, iv);
            if xv.is_nan() {
                self.scratch.member_level[j] = NA_LEVEL;
                if nc > 0 {
                    if data.weight(j) > 0.0 {
                        sdev -= 2.0
                            * data.weight(j)
                            * self.nodes.yprob(inode)[data.class_index(j)].ln();
                    }
                } else {
                    let d = data.y(j) - self.nodes.yval(inode);
                    sdev += data.weight(j) * d * d;
                }
            } else {
                let l = xv as usize - 1;
                self.scratch.member_level[j] = l as i32;
                if data.weight(j) > 0.0 {
                    self.scratch.seen[l] = true;
                }
            }
        }
        if self.gini && sdev > 0.0 {
            return Err(TreeError::GiniWithMissing);
        }

        let gini = self.gini;
        let min_cut = self.min_cut;
        let node_n = self.nodes.n(inode);
        let scratch = &mut self.scratch;
        let mut nll = 0usize;
        for l in 0..nl {
            if scratch.seen[l] {
                scratch.present[nll] = l;
                nll += 1;
            }
        }
        if nll < 2 {
            return Ok(());
        }

        for l in 0..nl {
            scratch.cnt[l] = 0.0;
            if nc > 0 {
                for k in 0..nc {
                    scratch.tab[k + nc * l] = 0.0;
                }
            } else {
                scratch.ys[l] = 0.0;
            }
        }
        let mut ytot = 0.0;
        let mut y2 = 0.0;
        for j in 0..nobs {
            let ml = scratch.member_level[j];
            if ml >= 0 {
                let l = ml as usize;
                let w = data.weight(j);
                scratch.cnt[l] += w;
                if nc > 0 {
                    scratch.tab[data.class_index(j) + nc * l] += w;
                } else {
                    let yv = data.y(j);
                    scratch.ys[l] += w * yv;
                    y2 += w * yv * yv;
                    ytot += w * yv;
                }
            }
        }
        // compact away absent levels
        for l in 0..nll {
            let src = scratch.present[l];
            scratch.cnt[l] = scratch.cnt[src];
            if nc > 0 {
                for k in 0..nc {
                    scratch.tab[k + nc * l] = scratch.tab[k + nc * src];
                }
            } else {
                scratch.ys[l] = scratch.ys[src];
            }
        }

        if nll == 2 {
            // the single non-trivial bipartition
            for l in 0..2 {
                if scratch.cnt[l] < min_cut {
                    return Ok(());
                }
            }
            let mut ldev = 0.0;
            if nc > 0 {
                for l in 0..2 {
                    if gini {
                        let mut psq = 0.0;
                        for k in 0..nc {
                            let p = scratch.tab[k + nc * l] / scratch.cnt[l];
                            psq += p * p;
                        }
                        ldev += scratch.cnt[l] * (1.0 - psq);
                    } else {
                        ldev += xlogx(scratch.cnt[l]);
                        for k in 0..nc {
                            ldev -= xlogx(scratch.tab[k + nc * l]);
                        }
                    }
                }
                ldev *= 2.0;
            } else {
                for l in 0..2 {
                    ldev += scratch.ys[l] * scratch.ys[l] / scratch.cnt[l];
                }
                ldev = y2 - ldev;
            }
            let val = ldev + sdev;
            if val >= devtarget || val >= *bval {
                return Ok(());
            }
            *bval = val;
            let first = scratch.present[0];
            let second = scratch.present[1];
            let labl: String = [':', LEVEL_ALPHABET[first]].iter().collect();
            let labr: String = [':', LEVEL_ALPHABET[second]].iter().collect();
            for j in 0..nobs {
                let ml = scratch.member_level[j];
                scratch.routing[j] = if ml < 0 {
                    ml
                } else {
                    (ml as usize != first) as i32
                };
            }
            self.nodes.set_var(inode, iv + 1);
            self.nodes.set_labels(inode, labl, labr);
            return Ok(());
        }

        if nc <= 2 || data.ordered(iv) {
            // a scalar score per level induces an order whose threshold
            // splits are optimal for two classes and squared error
            if data.ordered(iv) {
                for l in 0..nll {
                    scratch.score[l] = l as f64;
                    scratch.sorted_score[l] = l as f64;
                }
            } else {
                if nc > 0 {
                    for l in 0..nll {
                        scratch.score[l] = scratch.tab[1 + nc * l] / scratch.cnt[l];
                        scratch.sorted_score[l] = scratch.score[l];
                    }
                } else {
                    for l in 0..nll {
                        scratch.score[l] = scratch.ys[l] / scratch.cnt[l];
                        scratch.sorted_score[l] = scratch.score[l];
                    }
                }
                for l in 0..nll {
                    scratch.score_payload[l] = l;
                    scratch.score_weight[l] = 0.0;
                }
                shell_sort(
                    &mut scratch.sorted_score[..nll],
                    &mut scratch.score_payload[..nll],
                    &mut scratch.score_weight[..nll],
                );
            }
            let mut bdev = devtarget;
            let mut bfence = -1.0;
            for i in 1..nll {
                let fence = scratch.sorted_score[i];
                if scratch.sorted_score[i - 1] == fence {
                    continue;
                }
                let mut cntl = 0.0;
                let mut cntr = 0.0;
                for l in 0..nll {
                    if scratch.score[l] < fence {
                        cntl += scratch.cnt[l];
                    } else {
                        cntr += scratch.cnt[l];
                    }
                }
                if cntl < min_cut || cntr < min_cut {
                    continue;
                }
                let ldev;
                if nc > 0 {
                    let mut acc = if gini {
                        node_n
                    } else {
                        xlogx(cntl) + xlogx(cntr)
                    };
                    for k in 0..nc {
                        let mut cl = 0.0;
                        let mut cr = 0.0;
                        for l in 0..nll {
                            if scratch.score[l] < fence {
                                cl += scratch.tab[k + nc * l];
                            } else {
                                cr += scratch.tab[k + nc * l];
                            }
                        }
                        if gini {
                            acc -= cl * cl / cntl + cr * cr / cntr;
                        } else {
                            acc -= xlogx(cl) + xlogx(cr);
                        }
                    }
                    ldev = 2.0 * acc;
                } else {
                    let mut ysum = 0.0;
                    for l in 0..nll {
                        if scratch.score[l] < fence {
                            ysum += scratch.ys[l];
                        }
                    }
                    ldev = y2 - ysum * ysum / cntl - (ytot - ysum) * (ytot - ysum) / cntr;
                }
                if ldev < bdev {
                    bdev = ldev;
                    bfence = fence;
                }
            }
            let val = bdev + sdev;
            log::trace!("predictor {} best value {} at fence {}", iv, val, bfence);
            if val >= devtarget || val >= *bval {
                return Ok(());
            }
            *bval = val;
            let mut labl = String::from(":");
            let mut labr = String::from(":");
            for l in 0..nll {
                let c = LEVEL_ALPHABET[scratch.present[l]];
                if scratch.score[l] < bfence {
                    labl.push(c);
                } else {
                    labr.push(c);
                }
            }
            for l in 0..nl {
                scratch.left_full[l] = false;
            }
            for l in 0..nll {
                if scratch.score[l] < bfence {
                    scratch.left_full[scratch.present[l]] = true;
                }
            }
            for j in 0..nobs {
                let ml = scratch.member_level[j];
                scratch.routing[j] = if ml < 0 {
                    ml
                } else {
                    (!scratch.left_full[ml as usize]) as i32
                };
            }
            self.nodes.set_var(inode, iv + 1);
            self.nodes.set_labels(inode, labl, labr);
            return Ok(());
        }

        // exhaustive enumeration over left sets containing the first level
        let mi = 1usize << (nll - 1);
        let mut bdev = devtarget;
        let mut best_mask = None;
        for mask in 0..mi - 1 {
            scratch.left_compact[0] = true;
            for l in 1..nll {
                scratch.left_compact[l] = (mask >> (l - 1)) & 1 == 1;
            }
            let mut cntl = 0.0;
            let mut cntr = 0.0;
            for l in 0..nll {
                if scratch.left_compact[l] {
                    cntl += scratch.cnt[l];
                } else {
                    cntr += scratch.cnt[l];
                }
            }
            if cntl < min_cut || cntr < min_cut {
                continue;
            }
            let mut acc = if gini {
                node_n
            } else {
                xlogx(cntl) + xlogx(cntr)
            };
            for k in 0..nc {
                let mut cl = 0.0;
                let mut cr = 0.0;
                for l in 0..nll {
                    if scratch.left_compact[l] {
                        cl += scratch.tab[k + nc * l];
                    } else {
                        cr += scratch.tab[k + nc * l];
                    }
                }
                if gini {
                    acc -= cl * cl / cntl + cr * cr / cntr;
                } else {
                    acc -= xlogx(cl) + xlogx(cr);
                }
            }
            let ldev = 2.0 * acc;
            if ldev < bdev {
                bdev = ldev;
                best_mask = Some(mask);
            }
        }
        let val = bdev + sdev;
        log::trace!("predictor {} best value {} (exhaustive)", iv, val);
        if val >= *bval || val >= devtarget {
            return Ok(());
        }
        let Some(mask) = best_mask else {
            return Ok(());
        };
        *bval = val;
        scratch.left_compact[0] = true;
        for l in 1..nll {
            scratch.left_compact[l] = (mask >> (l - 1)) & 1 == 1;
        }
        let mut labl = String::from(":");
        let mut labr = String::from(":");
        for l in 0..nll {
            let c = LEVEL_ALPHABET[scratch.present[l]];
            if scratch.left_compact[l] {
                labl.push(c);
            } else {
                labr.push(c);
            }
        }
        for l in 0..nl {
            scratch.left_full[l] = false;
        }
        for l in 0..nll {
            scratch.left_full[scratch.present[l]] = scratch.left_compact[l];
        }
        for j in 0..nobs {
            let ml = scratch.member_level[j];
            scratch.routing[j] = if ml < 0 {
                ml
            } else {
                (!scratch.left_full[ml as usize]) as i32
            };
        }
        self.nodes.set_var(inode, iv + 1);
        self.nodes.set_labels(inode, labl, labr);
        Ok(())
    }
}
